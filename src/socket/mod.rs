//! Realtime channel: one authenticated duplex event connection per session.
//!
//! The channel relays named server events (new message, new conversation,
//! presence, call signaling) to the store's orchestration layer and carries
//! local send intents outbound. One `SocketHandle` exists per authenticated
//! session; reconnects reuse it, with a bounded number of attempts and fixed
//! backoff. Exhausting the attempts surfaces a connectivity failure event,
//! never a crash.

pub mod client;
pub mod events;
pub mod request;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::auth::Session;
use crate::models::{RawMessage, RemoteConversation};

pub use client::{ChatSocket, SocketError};
pub use events::{Frame, ServerEvent};
use request::PendingRequests;

/// Maximum consecutive failed connection attempts before giving up.
pub const RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between reconnection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// A connection that survived this long is considered stable; the attempt
/// counter resets so a later blip gets the full retry budget again.
const STABLE_THRESHOLD: Duration = Duration::from_secs(60);

/// Heartbeat interval while connected.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a correlated request may wait for its response.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection lifecycle state, surfaced to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

/// Handle to the session's single channel instance.
///
/// Dropping the event receiver or calling [`SocketHandle::stop`] tears the
/// connection task down; no store dispatches can leak past teardown.
pub struct SocketHandle {
    outbound_tx: mpsc::UnboundedSender<Frame>,
    pending: Arc<PendingRequests>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    /// Start the channel. Connection and reconnection run in a background
    /// task; decoded events arrive on `event_tx`.
    ///
    /// The session is reloaded on every attempt so refreshed credentials are
    /// picked up across reconnects.
    pub fn start(socket_url: String, event_tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingRequests::new());

        let task = tokio::spawn(run(socket_url, event_tx, outbound_rx, Arc::clone(&pending)));

        Self {
            outbound_tx,
            pending,
            task,
        }
    }

    /// Queue a frame for sending. Frames queued while disconnected are
    /// delivered once the connection (re)establishes.
    pub fn emit(&self, frame: Frame) {
        if self.outbound_tx.send(frame).is_err() {
            tracing::warn!("socket task gone -- outbound frame dropped");
        }
    }

    /// Emit a local send intent.
    pub fn send_text_message(&self, msg: &RawMessage) {
        self.emit(events::text_message_frame(msg));
    }

    /// Request the room listing and await the correlated response.
    pub async fn get_direct_conversations(
        &self,
        subject_id: &str,
    ) -> Result<Vec<RemoteConversation>, SocketError> {
        let (correlation_id, rx) = self.pending.register();
        self.emit(events::get_direct_conversations_frame(
            subject_id,
            &correlation_id,
        ));

        let data = time::timeout(REQUEST_TIMEOUT, rx)
            .await
            .map_err(|_| SocketError::RequestDropped)?
            .map_err(|_| SocketError::RequestDropped)?;

        Ok(serde_json::from_value(data)?)
    }

    /// Tear the channel down: abort the connection task and fail every
    /// outstanding correlated request.
    pub fn stop(&self) {
        self.task.abort();
        self.pending.clear();
    }
}

/// Connection supervisor: bounded attempts, fixed backoff.
async fn run(
    socket_url: String,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
    pending: Arc<PendingRequests>,
) {
    let mut attempt: u32 = 1;

    loop {
        if event_tx.send(ServerEvent::Connecting { attempt }).is_err() {
            return;
        }

        let mut connected_at: Option<Instant> = None;
        match connect_once(
            &socket_url,
            &event_tx,
            &mut outbound_rx,
            &pending,
            &mut connected_at,
        )
        .await
        {
            Ok(()) => return,
            Err(e) => {
                // Fail outstanding requests so awaiting callers do not hang
                // until their timeout.
                pending.clear();
                tracing::warn!("socket disconnected: {}", e);
                if event_tx
                    .send(ServerEvent::Disconnected {
                        reason: e.to_string(),
                    })
                    .is_err()
                {
                    return;
                }

                attempt = next_attempt(attempt, connected_at.map(|t| t.elapsed()));

                if attempt > RECONNECT_ATTEMPTS {
                    let _ = event_tx.send(ServerEvent::ConnectionFailed {
                        attempts: RECONNECT_ATTEMPTS,
                    });
                    return;
                }

                time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Attempt counter for the next reconnect. Only time spent connected counts
/// toward stability; a slow failed dial must not restore the retry budget.
fn next_attempt(attempt: u32, connected_for: Option<Duration>) -> u32 {
    if connected_for.is_some_and(|d| d >= STABLE_THRESHOLD) {
        1
    } else {
        attempt + 1
    }
}

/// One full connection: authenticate, connect, event loop.
///
/// Returns `Ok(())` only when the consumer side went away (clean teardown).
/// `connected_at` is set once the handshake completes, so the supervisor can
/// tell connected time apart from time spent dialing.
async fn connect_once(
    socket_url: &str,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
    outbound_rx: &mut mpsc::UnboundedReceiver<Frame>,
    pending: &PendingRequests,
    connected_at: &mut Option<Instant>,
) -> Result<(), SocketError> {
    // Reload the session each attempt to pick up refreshed tokens.
    let session = Session::load().map_err(|e| SocketError::Auth(e.to_string()))?;
    let token = session
        .bearer_token()
        .map_err(|e| SocketError::Auth(e.to_string()))?;

    let mut ws = ChatSocket::connect(socket_url, &token).await?;
    *connected_at = Some(Instant::now());

    // Readiness is announced exactly once per connection; dependent setup
    // (conversation fetch) hangs off this event.
    if event_tx.send(ServerEvent::Ready).is_err() {
        return Ok(());
    }

    let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // skip the immediate first tick

    loop {
        tokio::select! {
            frame = ws.recv_frame() => {
                match frame? {
                    Some(frame) => {
                        if frame.event == "ack" {
                            if let Some(ref id) = frame.ack {
                                pending.complete(id, frame.data.clone());
                            }
                            continue;
                        }
                        if let Some(event) = ServerEvent::decode(&frame) {
                            if event_tx.send(event).is_err() {
                                return Ok(());
                            }
                        }
                    }
                    None => return Err(SocketError::Closed),
                }
            }
            out = outbound_rx.recv() => {
                match out {
                    Some(frame) => ws.send_frame(&frame).await?,
                    None => return Ok(()),
                }
            }
            _ = heartbeat.tick() => {
                ws.ping().await?;
            }
        }
    }
}

/// Connect, send one message, and wait for the server echo (CLI `send`).
///
/// The echo carries the client-generated message id, so seeing it back
/// confirms the server accepted the send.
pub async fn send_once(socket_url: String, msg: RawMessage) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let handle = SocketHandle::start(socket_url, event_tx);

    let result = time::timeout(REQUEST_TIMEOUT, async {
        while let Some(event) = event_rx.recv().await {
            match event {
                ServerEvent::Ready => handle.send_text_message(&msg),
                ServerEvent::NewMessage { message, .. } if message.id == msg.id => {
                    return Ok(());
                }
                ServerEvent::ConnectionFailed { attempts } => {
                    anyhow::bail!("connection failed after {} attempts", attempts);
                }
                _ => {}
            }
        }
        anyhow::bail!("socket closed before the send was confirmed");
    })
    .await
    .map_err(|_| anyhow::anyhow!("timed out waiting for send confirmation"))?;

    handle.stop();
    result
}

/// Connect and print decoded events to stdout until Ctrl-C (CLI `listen`).
pub async fn listen(socket_url: String) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let handle = SocketHandle::start(socket_url, event_tx);

    println!("Listening for events... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(ServerEvent::ConnectionFailed { attempts }) => {
                        println!("Connection failed after {} attempts.", attempts);
                        break;
                    }
                    Some(ev) => println!("{:?}", ev),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                break;
            }
        }
    }

    handle.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_connection_restores_retry_budget() {
        assert_eq!(next_attempt(4, Some(STABLE_THRESHOLD)), 1);
        assert_eq!(next_attempt(4, Some(STABLE_THRESHOLD * 2)), 1);
    }

    #[test]
    fn test_short_lived_connection_increments_attempts() {
        assert_eq!(next_attempt(2, Some(Duration::from_secs(5))), 3);
    }

    #[test]
    fn test_dial_time_never_counts_toward_stability() {
        // A handshake that never completed leaves no connected time, no
        // matter how long the dial itself took before failing.
        assert_eq!(next_attempt(2, None), 3);
        assert_eq!(next_attempt(RECONNECT_ATTEMPTS, None), RECONNECT_ATTEMPTS + 1);
    }
}
