//! Unix socket server for operator commands.
//!
//! JSON lines in both directions. A connection sends `run` requests carrying a
//! recipient and a command line; the node answers each request and then keeps streaming
//! every notification addressed to a recipient that connection has used.

use crate::command::Command;
use crate::error::Result;
use pinbot_core::{Notification, Pinbot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

/// Admin command sent over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Run a command line on behalf of `recipient`
    Run { recipient: String, line: String },
    /// Ping (health check)
    Ping,
}

/// Message from the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Accepted { command: String },
    Ignored { line: String },
    Error { error: String },
    Notification { recipient: String, text: String },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    bot: Pinbot,
    command_prefix: String,
    events: broadcast::Sender<Notification>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(
        bot: Pinbot,
        command_prefix: impl Into<String>,
        events: broadcast::Sender<Notification>,
        socket_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bot,
            command_prefix: command_prefix.into(),
            events,
            socket_path: socket_path.into(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let conn = Connection {
                        bot: self.bot.clone(),
                        command_prefix: self.command_prefix.clone(),
                        events: self.events.subscribe(),
                        recipients: HashSet::new(),
                    };
                    tokio::spawn(async move {
                        if let Err(e) = conn.serve(stream).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

struct Connection {
    bot: Pinbot,
    command_prefix: String,
    events: broadcast::Receiver<Notification>,
    recipients: HashSet<String>,
}

impl Connection {
    async fn serve(mut self, stream: UnixStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        loop {
            let response = tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => self.handle_line(&line),
                    None => break,
                },
                event = self.events.recv() => match event {
                    Ok(n) if self.recipients.contains(&n.recipient) => AdminResponse::Notification {
                        recipient: n.recipient,
                        text: n.text,
                    },
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Admin connection fell behind, notifications skipped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            let response_json = serde_json::to_string(&response)? + "\n";
            writer.write_all(response_json.as_bytes()).await?;
        }

        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> AdminResponse {
        let cmd = match serde_json::from_str::<AdminCommand>(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                return AdminResponse::Error {
                    error: format!("Invalid command: {}", e),
                }
            }
        };

        match cmd {
            AdminCommand::Ping => AdminResponse::Pong,
            AdminCommand::Run { recipient, line } => {
                let Some(command) = Command::parse(&self.command_prefix, &line) else {
                    return AdminResponse::Ignored { line };
                };
                tracing::info!(%recipient, command = command.name(), "Admin command");

                // Subscribe before the command can produce anything.
                self.recipients.insert(recipient.clone());
                let bot = self.bot.clone();
                tokio::spawn(async move { command.run(&bot, &recipient).await });

                AdminResponse::Accepted { command: line }
            }
        }
    }
}
