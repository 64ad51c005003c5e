//! Named-event wire contract for the realtime channel.
//!
//! Every frame in both directions is a JSON envelope: an event name, an
//! optional correlation id (`ack`), and an event-specific payload. The
//! envelope is the whole framing contract; the transport underneath is an
//! opaque WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{PresenceFact, RawMessage, RemoteConversation};

/// JSON envelope for one frame on the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Server-pushed events after decoding, plus channel lifecycle notices
/// synthesized by the connection task.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A connection attempt is underway.
    Connecting { attempt: u32 },
    /// Channel connected and usable. Announced exactly once per connection,
    /// so dependent setup (conversation fetch) can hang off it.
    Ready,
    NewMessage {
        conversation_id: Option<String>,
        message: RawMessage,
    },
    StartChat {
        conversation: RemoteConversation,
    },
    PresenceUpdate(PresenceFact),
    /// Call signaling passthrough. Not interpreted by the core.
    CallSignal { event: String, data: Value },
    /// Connection dropped; a reconnect attempt may follow.
    Disconnected { reason: String },
    /// Reconnection attempts exhausted. User-visible connectivity failure.
    ConnectionFailed { attempts: u32 },
}

#[derive(Debug, Deserialize)]
struct NewMessageData {
    conversation_id: Option<String>,
    message: RawMessage,
}

#[derive(Debug, Deserialize)]
struct StartChatData {
    conversation: RemoteConversation,
}

impl ServerEvent {
    /// Decode an inbound frame into a typed event.
    ///
    /// Correlated responses (`ack` frames) are handled by the connection task
    /// before this runs. Unknown or malformed events return `None`; they are
    /// logged and skipped rather than tearing the channel down.
    pub fn decode(frame: &Frame) -> Option<ServerEvent> {
        match frame.event.as_str() {
            "new_message" => {
                let data: NewMessageData = serde_json::from_value(frame.data.clone())
                    .map_err(|e| tracing::debug!("malformed new_message: {}", e))
                    .ok()?;
                Some(ServerEvent::NewMessage {
                    conversation_id: data.conversation_id,
                    message: data.message,
                })
            }
            "start_chat" => {
                let data: StartChatData = serde_json::from_value(frame.data.clone())
                    .map_err(|e| tracing::debug!("malformed start_chat: {}", e))
                    .ok()?;
                Some(ServerEvent::StartChat {
                    conversation: data.conversation,
                })
            }
            "presence_update" => {
                let fact: PresenceFact = serde_json::from_value(frame.data.clone())
                    .map_err(|e| tracing::debug!("malformed presence_update: {}", e))
                    .ok()?;
                Some(ServerEvent::PresenceUpdate(fact))
            }
            ev if ev.starts_with("call_") => Some(ServerEvent::CallSignal {
                event: frame.event.clone(),
                data: frame.data.clone(),
            }),
            other => {
                tracing::debug!("unhandled socket event: {}", other);
                None
            }
        }
    }
}

/// Build the outbound `text_message` frame for a local send.
pub fn text_message_frame(msg: &RawMessage) -> Frame {
    Frame {
        event: "text_message".to_string(),
        ack: None,
        data: serde_json::json!({
            "id": msg.id,
            "message": msg.message,
            "from": msg.from,
            "to": msg.to,
            "conversation_id": msg.conversation_id,
            "type": msg.kind,
        }),
    }
}

/// Build the correlated room-listing request.
pub fn get_direct_conversations_frame(subject_id: &str, correlation_id: &str) -> Frame {
    Frame {
        event: "get_direct_conversations".to_string(),
        ack: Some(correlation_id.to_string()),
        data: serde_json::json!({ "subjectId": subject_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: Value) -> Frame {
        Frame {
            event: event.to_string(),
            ack: None,
            data,
        }
    }

    #[test]
    fn test_decode_new_message() {
        let data = serde_json::json!({
            "conversation_id": "c1",
            "message": { "id": "m1", "message": "hi", "from": "u1" }
        });
        match ServerEvent::decode(&frame("new_message", data)) {
            Some(ServerEvent::NewMessage {
                conversation_id,
                message,
            }) => {
                assert_eq!(conversation_id.as_deref(), Some("c1"));
                assert_eq!(message.id, "m1");
                assert_eq!(message.from.as_deref(), Some("u1"));
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_presence_update() {
        let data = serde_json::json!({
            "userId": "u1",
            "status": true,
            "lastSeen": "2024-06-01T12:00:00Z"
        });
        match ServerEvent::decode(&frame("presence_update", data)) {
            Some(ServerEvent::PresenceUpdate(fact)) => {
                assert_eq!(fact.user_id, "u1");
                assert!(fact.status);
                assert!(fact.last_seen.is_some());
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_start_chat_with_partial_record() {
        let data = serde_json::json!({
            "conversation": { "_id": "c1", "participants": [{ "keycloakId": "u1" }] }
        });
        match ServerEvent::decode(&frame("start_chat", data)) {
            Some(ServerEvent::StartChat { conversation }) => {
                assert_eq!(conversation.id.as_deref(), Some("c1"));
                assert!(conversation.messages.is_empty());
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_call_events_pass_through() {
        let ev = ServerEvent::decode(&frame("call_offer", serde_json::json!({"sdp": "x"})));
        assert!(matches!(ev, Some(ServerEvent::CallSignal { .. })));
    }

    #[test]
    fn test_unknown_and_malformed_events_are_skipped() {
        assert!(ServerEvent::decode(&frame("mystery", Value::Null)).is_none());
        // new_message without the required message payload
        assert!(ServerEvent::decode(&frame("new_message", serde_json::json!({}))).is_none());
    }

    #[test]
    fn test_text_message_frame_shape() {
        let msg = RawMessage::outgoing_text("hello", "u2", Some("u1"), "c1");
        let f = text_message_frame(&msg);
        assert_eq!(f.event, "text_message");
        assert_eq!(f.data["message"], "hello");
        assert_eq!(f.data["conversation_id"], "c1");
        assert_eq!(f.data["type"], "text");
    }
}
