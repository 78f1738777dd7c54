//! Unix domain socket server for IPC

use crate::app::AppHandle;
use anyhow::{Context, Result};
use spark_ipc::{read_message, write_message, Command, IpcError, Response};
use std::path::Path;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

/// Binds the control socket, replacing a stale one left by a previous run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind control socket at {:?}", path))?;
    info!("IPC server listening on {:?}", path);
    Ok(listener)
}

pub async fn serve(listener: UnixListener, app: AppHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, app).await {
                        error!("Error handling client: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, app: AppHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let response = match read_message::<Command, _>(&mut reader).await {
        Ok(command) => {
            debug!("Received {:?}", command);
            respond(command, &app).await?
        }
        Err(IpcError::Serialization(e)) => {
            warn!("Malformed request: {}", e);
            Response::Error(format!("malformed request: {}", e))
        }
        Err(e) => return Err(e.into()),
    };

    write_message(&mut writer, &response).await?;
    Ok(())
}

async fn respond(command: Command, app: &AppHandle) -> Result<Response> {
    let response = match command.control() {
        Some(control) => match app.dispatch(control).await? {
            Ok(()) => Response::Ok,
            Err(rejected) => Response::Error(rejected.to_string()),
        },
        None => Response::Status(app.snapshot().await?),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::schedule::Schedule;
    use crate::session::Session;
    use spark_ipc::{request, SessionStatus};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    fn spawn_server(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("spark.sock");
        let (app, handle) = App::new(
            Session::new(Schedule::spark(60_000)),
            Duration::from_millis(5),
        );
        tokio::spawn(app.run());
        let listener = bind(&path).unwrap();
        tokio::spawn(serve(listener, handle));
        path
    }

    async fn status(path: &Path) -> spark_ipc::SessionSnapshot {
        match request(path, Command::Status).await.unwrap() {
            Response::Status(snapshot) => snapshot,
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn controls_drive_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = spawn_server(&dir);

        assert_eq!(status(&path).await.status, SessionStatus::Initial);
        assert_eq!(request(&path, Command::Start).await.unwrap(), Response::Ok);

        let running = status(&path).await;
        assert_eq!(running.status, SessionStatus::Running);
        assert!(running.started_at.is_some());

        assert_eq!(request(&path, Command::Pause).await.unwrap(), Response::Ok);
        assert_eq!(status(&path).await.status, SessionStatus::Paused);

        assert_eq!(request(&path, Command::Reset).await.unwrap(), Response::Ok);
        let reset = status(&path).await;
        assert_eq!(reset.status, SessionStatus::Initial);
        assert!(reset.started_at.is_none());
        assert!(reset.blocks.iter().all(|b| b.elapsed_ms == 0));
    }

    #[tokio::test]
    async fn unavailable_control_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = spawn_server(&dir);

        assert_eq!(
            request(&path, Command::Resume).await.unwrap(),
            Response::Error("resume is not available while initial".to_string())
        );
    }

    #[tokio::test]
    async fn malformed_request_gets_an_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let path = spawn_server(&dir);

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        writer.write_all(b"{\"Skip\":1}\n").await.unwrap();

        let mut line = String::new();
        BufReader::new(reader).read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();
        assert!(matches!(response, Response::Error(message) if message.starts_with("malformed request")));

        // The server keeps accepting after a bad client.
        assert_eq!(status(&path).await.status, SessionStatus::Initial);
    }

    #[tokio::test]
    async fn stale_socket_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spark.sock");
        std::fs::write(&path, b"stale").unwrap();
        assert!(bind(&path).is_ok());
    }
}
