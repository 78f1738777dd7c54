use anyhow::Result;
use clap::{Parser, Subcommand};
use spark_ipc::{request, BlockStatus, Command, Response, SessionSnapshot, DEFAULT_SOCKET_PATH};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sparkctl")]
#[command(about = "Control the SPARK practice timer", long_about = None)]
struct Cli {
    /// Control socket of the running timer
    #[arg(short, long, global = true, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the session
    Start,
    /// Pause the running block
    Pause,
    /// Resume the paused block
    Resume,
    /// Reset the session to its first block
    Reset,
    /// Show the session status
    Status,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Start => Command::Start,
            Commands::Pause => Command::Pause,
            Commands::Resume => Command::Resume,
            Commands::Reset => Command::Reset,
            Commands::Status => Command::Status,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match request(&cli.socket, cli.command.into()).await? {
        Response::Ok => println!("OK"),
        Response::Status(snapshot) => print!("{}", render_status(&snapshot)),
        Response::Error(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn render_status(snapshot: &SessionSnapshot) -> String {
    let mut out = format!(
        "State: {} (block {}/{})\n",
        snapshot.status,
        snapshot.current_index + 1,
        snapshot.blocks.len()
    );
    if let Some(started_at) = snapshot.started_at {
        out.push_str(&format!("Started: {}\n", started_at.format("%Y-%m-%d %H:%M:%S")));
    }
    for block in &snapshot.blocks {
        let mark = match block.status {
            BlockStatus::Pending => " ",
            BlockStatus::Running => ">",
            BlockStatus::Done => "✓",
        };
        out.push_str(&format!(
            "[{}] {:<20} {} / {}\n",
            mark,
            block.title,
            clock(block.elapsed_ms),
            clock(block.total_ms)
        ));
    }
    out
}

fn clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
