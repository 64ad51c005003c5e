//! Conversation-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::RawMessage;

/// A conversation record as returned by the REST collaborator and the
/// socket's room-listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConversation {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// One participant entry inside a remote conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub keycloak_id: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Normalized conversation summary owned by the store.
///
/// `user_id` is the counterpart's identity-provider id. It may be transiently
/// absent (partial remote record); the store must never drop a non-null value
/// during an update, and the selection policy treats its loss on the current
/// pointer as recoverable.
///
/// The summary fields (`last_message`, `last_message_at`, `unread`) are
/// derived from the message sequence, not independently authoritative.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conversation {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub image: Option<String>,
    pub online: bool,
    /// Relative last-seen text, recomputed on presence events.
    pub last_seen: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread: u32,
    /// Embedded message sequence; insertion order is chronological order.
    pub messages: Vec<RawMessage>,
}
