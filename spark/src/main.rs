use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

mod app;
mod clock;
mod config;
mod ipc;
mod schedule;
mod session;
mod ui;
mod view;

use app::{App, AppHandle};
use config::Config;
use schedule::Schedule;
use session::Session;

#[derive(Parser)]
#[command(name = "spark")]
#[command(about = "SPARK practice session timer", long_about = None)]
struct Cli {
    /// Run every block for the short test duration
    #[arg(long)]
    test: bool,
    /// Run without the terminal UI, controlled only through sparkctl
    #[arg(long)]
    headless: bool,
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Control socket path, overriding the config
    #[arg(short, long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config, cli.headless)?;

    let block_duration_ms = config.block_duration_ms(cli.test);
    info!(
        "Starting session: {} ms per block, test mode {}",
        block_duration_ms, cli.test
    );
    let session = Session::new(Schedule::spark(block_duration_ms));
    let (app, handle) = App::new(session, config.tick_interval());
    let driver = tokio::spawn(app.run());

    let socket_path = cli.socket.unwrap_or_else(|| config.socket_path.clone());
    let listener = ipc::server::bind(&socket_path)?;
    let server = tokio::spawn(ipc::server::serve(listener, handle.clone()));

    let result = if cli.headless {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")
    } else {
        tokio::task::spawn_blocking(move || run_tui(handle, &config))
            .await
            .context("Terminal UI panicked")?
    };

    server.abort();
    driver.abort();
    let _ = std::fs::remove_file(&socket_path);
    info!("Shutting down");
    result
}

fn init_logging(config: &Config, headless: bool) -> Result<()> {
    let subscriber = tracing_subscriber::fmt().with_max_level(config.log_level()?);
    if headless {
        subscriber.with_writer(io::stderr).init();
    } else {
        // The terminal belongs to the UI, so logs go to a file.
        let path = config::log_path()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file at {:?}", path))?;
        subscriber
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn run_tui(handle: AppHandle, config: &Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &handle, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    handle: &AppHandle,
    config: &Config,
) -> Result<()> {
    loop {
        let session = handle.session();
        terminal.draw(|f| ui::draw(f, &session, config))?;

        if event::poll(config.tick_interval())? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    code => {
                        if let Some(control) = ui::control_for_key(code, session.status()) {
                            handle.blocking_dispatch(control)?;
                        }
                    }
                }
            }
        }
    }
}
