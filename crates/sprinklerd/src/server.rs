//! Request socket
//!
//! Accepts local clients on a Unix socket speaking newline-delimited JSON:
//! one command per line in, one reply envelope per line out. The external
//! web frontend proxies its HTTP requests through here.

use anyhow::{Context, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::commands::handle_command;
use sprinkler_api::{Command, ErrorCode, Reply};
use sprinkler_core::Controller;

pub struct RequestServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl RequestServer {
    /// Bind the request socket, replacing a stale one if present.
    pub fn bind(socket_path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o660))?;

        info!(path = %socket_path.display(), "Request socket listening");

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self, controller: Arc<Mutex<Controller>>) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    debug!("Client connected");
                    tokio::spawn(handle_client(stream, controller.clone()));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

impl Drop for RequestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

async fn handle_client(stream: UnixStream, controller: Arc<Mutex<Controller>>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let reply = match serde_json::from_str::<Command>(line) {
                    Ok(command) => {
                        // One command at a time; the controller lock spans
                        // the whole read-modify-write.
                        let mut controller = controller.lock().await;
                        handle_command(&mut controller, command)
                    }
                    Err(e) => {
                        warn!(error = %e, "Invalid command");
                        Reply {
                            error: ErrorCode::MissingParameter.code(),
                            desc: format!("Invalid command: {}", e),
                            data: None,
                        }
                    }
                };

                let mut msg = match serde_json::to_string(&reply) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize reply");
                        continue;
                    }
                };
                msg.push('\n');

                if let Err(e) = write_half.write_all(msg.as_bytes()).await {
                    debug!(error = %e, "Write error");
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "Read error");
                break;
            }
        }
    }
}
