// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! IPC server over a Unix socket (or a named pipe on Windows)
//!
//! One JSON message per line in each direction.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::blog::Blog;
use crate::models::{error_codes, new_message_id, IpcError, IpcMessage};

use super::handler::MessageHandler;

/// IPC server accepting client connections until shut down
pub struct IpcServer {
    handler: Arc<MessageHandler>,
    shutdown_tx: broadcast::Sender<()>,
    socket_path: String,
}

impl IpcServer {
    pub fn new(blog: Blog, socket_path: impl Into<String>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            handler: Arc::new(MessageHandler::new(blog, shutdown_tx.clone())),
            shutdown_tx,
            socket_path: socket_path.into(),
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Accept connections until a `shutdown` request or Ctrl-C
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!("Starting IPC server on {}", self.socket_path);

        let server = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received");
                server.shutdown();
            }
        });

        #[cfg(windows)]
        {
            self.run_windows_pipe().await
        }

        #[cfg(not(windows))]
        {
            self.run_unix_socket().await
        }
    }

    #[cfg(not(windows))]
    async fn run_unix_socket(&self) -> Result<()> {
        use tokio::net::UnixListener;

        // Stale socket from an earlier run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind Unix socket {}", self.socket_path))?;
        let mut shutdown = self.shutdown_signal();

        info!("Listening on {}", self.socket_path);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            info!("Client connected");
                            let (reader, writer) = stream.into_split();
                            self.spawn_client(reader, writer);
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }

    #[cfg(windows)]
    async fn run_windows_pipe(&self) -> Result<()> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let mut shutdown = self.shutdown_signal();
        let mut first = true;

        loop {
            let pipe = ServerOptions::new()
                .first_pipe_instance(first)
                .create(&self.socket_path)
                .context("Failed to create named pipe")?;
            first = false;

            tokio::select! {
                result = pipe.connect() => {
                    match result {
                        Ok(()) => {
                            info!("Client connected");
                            let (reader, writer) = tokio::io::split(pipe);
                            self.spawn_client(reader, writer);
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_client<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let handler = self.handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(reader, writer, handler).await {
                error!("Client handler error: {:#}", e);
            }
        });
    }
}

/// Answer newline-delimited requests until the client hangs up
///
/// A line that is not a valid message gets a parse error response and the
/// connection stays open.
pub async fn serve_connection<R, W>(reader: R, mut writer: W, handler: Arc<MessageHandler>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read from client")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!("Received message: {}", trimmed);

        let response = match serde_json::from_str::<IpcMessage>(trimmed) {
            Ok(msg) => handler.handle_message(msg).await,
            Err(e) => {
                warn!("Failed to parse message: {}", e);
                IpcMessage::response_err(
                    &new_message_id(),
                    IpcError::new(
                        error_codes::PARSE_ERROR,
                        format!("Failed to parse message: {}", e),
                    ),
                )
            }
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        debug!("Sent response: {}", response_json);
    }

    info!("Client disconnected");
    Ok(())
}
