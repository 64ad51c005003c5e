//! Async REST bridge for the TUI event loop.
//!
//! The event loop stays synchronous-feeling: it sends a `BackendCommand`
//! and later receives a `BackendResponse` in its select loop, while a
//! background task owns the HTTP client and runs the actual calls. The
//! realtime socket has its own channel; this bridge only covers the REST
//! collaborator.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::api::{self, ApiClient, Profile};
use crate::models::RemoteConversation;

pub enum BackendCommand {
    /// Snapshot fetch over REST (fallback when the socket is unavailable).
    LoadConversations,
    LoadProfile,
}

pub enum BackendResponse {
    Conversations(Result<Vec<RemoteConversation>>),
    Profile(Result<Profile>),
    /// Building the HTTP client failed (credential problem); the backend
    /// has exited.
    ClientError(String),
}

/// TUI-side handle to the background REST task.
pub struct Backend {
    command_tx: mpsc::UnboundedSender<BackendCommand>,
    response_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    pub fn start() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(command_rx, response_tx));
        Self {
            command_tx,
            response_rx,
        }
    }

    pub fn send(&self, cmd: BackendCommand) {
        if self.command_tx.send(cmd).is_err() {
            tracing::error!("backend task gone -- command dropped");
        }
    }

    /// Next response, for `tokio::select!`. `None` means the backend exited.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.response_rx.recv().await
    }
}

/// Owns the shared client; each command runs as its own task so a slow call
/// cannot hold up the next one.
async fn serve(
    mut command_rx: mpsc::UnboundedReceiver<BackendCommand>,
    response_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let client = match ApiClient::new().await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            let _ = response_tx.send(BackendResponse::ClientError(format!("{:#}", e)));
            return;
        }
    };

    while let Some(cmd) = command_rx.recv().await {
        let client = Arc::clone(&client);
        let response_tx = response_tx.clone();
        tokio::spawn(async move {
            let response = match cmd {
                BackendCommand::LoadConversations => {
                    BackendResponse::Conversations(api::fetch_conversations(&client).await)
                }
                BackendCommand::LoadProfile => {
                    BackendResponse::Profile(api::whoami_data(&client).await)
                }
            };
            let _ = response_tx.send(response);
        });
    }
}
