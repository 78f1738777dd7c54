//! Inter-process communication between spark and sparkctl
//!
//! Local Unix domain socket, one newline-delimited JSON request and one
//! response per connection. The status enums shared by the timer and its
//! clients live here too so both sides agree on their wire names.

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/spark.sock";

/// Requests sparkctl can send to spark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    Status,
}

impl Command {
    /// The session control this command dispatches, if any.
    pub fn control(self) -> Option<Control> {
        match self {
            Command::Start => Some(Control::Start),
            Command::Pause => Some(Control::Pause),
            Command::Resume => Some(Control::Resume),
            Command::Reset => Some(Control::Reset),
            Command::Status => None,
        }
    }
}

/// Responses from spark back to sparkctl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Status(SessionSnapshot),
    Error(String),
}

/// A discrete user-issued command driving the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Start,
    Pause,
    Resume,
    Reset,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Control::Start => "start",
            Control::Pause => "pause",
            Control::Resume => "resume",
            Control::Reset => "reset",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initial,
    Running,
    /// Waiting for the user to start the next block. Kept for clients that
    /// render it; the session never enters this status on its own.
    Waiting,
    Paused,
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Initial => "initial",
            SessionStatus::Running => "running",
            SessionStatus::Waiting => "waiting",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Pending,
    Running,
    Done,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockStatus::Pending => "pending",
            BlockStatus::Running => "running",
            BlockStatus::Done => "done",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_index: usize,
    pub started_at: Option<DateTime<Local>>,
    pub blocks: Vec<BlockSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub title: String,
    pub status: BlockStatus,
    pub elapsed_ms: u64,
    pub total_ms: u64,
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused - is spark running?")]
    ConnectionRefused,

    #[error("Peer closed the connection before sending a message")]
    EmptyMessage,
}

/// Reads one newline-terminated JSON message.
pub async fn read_message<T, R>(reader: &mut R) -> Result<T, IpcError>
where
    T: DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(IpcError::EmptyMessage);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Writes one message as JSON followed by a newline.
pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Sends a single command to the spark socket at `path` and waits for the reply.
pub async fn request(path: &Path, command: Command) -> Result<Response, IpcError> {
    let stream = UnixStream::connect(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => IpcError::ConnectionRefused,
        _ => IpcError::Io(e),
    })?;
    let (reader, mut writer) = stream.into_split();
    write_message(&mut writer, &command).await?;
    read_message(&mut BufReader::new(reader)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_are_newline_framed() {
        let (client, server) = tokio::io::duplex(1024);
        let (_, mut client_writer) = tokio::io::split(client);
        let (server_reader, _) = tokio::io::split(server);

        write_message(&mut client_writer, &Command::Pause).await.unwrap();
        write_message(&mut client_writer, &Command::Status).await.unwrap();

        let mut reader = BufReader::new(server_reader);
        let first: Command = read_message(&mut reader).await.unwrap();
        let second: Command = read_message(&mut reader).await.unwrap();
        assert_eq!(first, Command::Pause);
        assert_eq!(second, Command::Status);
    }

    #[tokio::test]
    async fn closed_stream_is_an_empty_message() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = BufReader::new(server);
        let result: Result<Command, _> = read_message(&mut reader).await;
        assert!(matches!(result, Err(IpcError::EmptyMessage)));
    }

    #[tokio::test]
    async fn unknown_command_is_a_serialization_error() {
        let mut reader = BufReader::new(&b"\"Skip\"\n"[..]);
        let result: Result<Command, _> = read_message(&mut reader).await;
        assert!(matches!(result, Err(IpcError::Serialization(_))));
    }

    #[tokio::test]
    async fn missing_socket_reports_connection_refused() {
        let dir = tempfile::tempdir().unwrap();
        let result = request(&dir.path().join("absent.sock"), Command::Status).await;
        assert!(matches!(result, Err(IpcError::ConnectionRefused)));
    }

    #[test]
    fn statuses_use_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Ended).unwrap(),
            "\"ended\""
        );
        assert_eq!(serde_json::to_string(&BlockStatus::Done).unwrap(), "\"done\"");
        assert_eq!(Control::Resume.to_string(), "resume");
    }

    #[test]
    fn only_status_carries_no_control() {
        assert_eq!(Command::Reset.control(), Some(Control::Reset));
        assert_eq!(Command::Status.control(), None);
    }
}
