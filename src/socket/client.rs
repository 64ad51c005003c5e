//! WebSocket connection and frame handling for the realtime channel.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};

use super::events::Frame;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Errors surfaced by the realtime channel.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("websocket connect failed: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("websocket transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("connection closed by server")]
    Closed,
    #[error("not authenticated: {0}")]
    Auth(String),
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request dropped before a response arrived")]
    RequestDropped,
}

/// One live WebSocket connection to the chat endpoint.
pub struct ChatSocket {
    stream: WsStream,
}

impl ChatSocket {
    /// Connect to the socket endpoint.
    ///
    /// Auth is the bearer credential passed as a query parameter; the server
    /// validates it during the HTTP upgrade, so no auth frames are needed on
    /// the socket itself.
    pub async fn connect(socket_url: &str, bearer_token: &str) -> Result<Self, SocketError> {
        let sep = if socket_url.contains('?') { '&' } else { '?' };
        let ws_url = format!("{}{}token={}", socket_url, sep, bearer_token);
        let ws_url = ws_url
            .replace("https://", "wss://")
            .replace("http://", "ws://");

        tracing::info!("Connecting WebSocket to {}", socket_url);

        let (stream, response) = connect_async(&ws_url)
            .await
            .map_err(SocketError::Connect)?;

        tracing::info!("WebSocket connected (status={})", response.status());

        Ok(Self { stream })
    }

    /// Send one event frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<(), SocketError> {
        let text = serde_json::to_string(frame)?;
        tracing::debug!("WS send: {}", text);
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a protocol-level ping (heartbeat).
    pub async fn ping(&mut self) -> Result<(), SocketError> {
        self.stream.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    /// Receive the next event frame.
    ///
    /// Pings are answered inline, unparseable text frames are logged and
    /// skipped, and `Ok(None)` means the server closed the connection.
    pub async fn recv_frame(&mut self) -> Result<Option<Frame>, SocketError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);
                    match serde_json::from_str::<Frame>(&text) {
                        Ok(frame) => return Ok(Some(frame)),
                        Err(e) => {
                            tracing::debug!("skipping unparseable frame: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(SocketError::Transport(e));
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }
}
