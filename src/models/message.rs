//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message content kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Link,
    Image,
    Document,
    Reply,
}

/// File attachment on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: Option<String>,
    pub mime_type: Option<String>,
}

/// A chat message as carried on the wire and stored in a conversation's
/// embedded sequence.
///
/// `id` is globally unique: client-generated (UUID v4) for optimistic sends,
/// origin-generated for server-confirmed messages. The server echo of a local
/// send carries the same id, which is what makes dedup-by-id work.
///
/// Incoming/outgoing is never stored here; it is derived at projection time
/// by comparing `from` against the current subject id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Id of the message being replied to, for `kind == Reply`.
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl RawMessage {
    /// A plain text message authored locally (optimistic send).
    pub fn outgoing_text(
        text: impl Into<String>,
        from: &str,
        to: Option<&str>,
        conversation_id: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message: text.into(),
            kind: MessageKind::Text,
            from: Some(from.to_string()),
            to: to.map(String::from),
            conversation_id: Some(conversation_id.to_string()),
            created_at: Some(Utc::now()),
            attachments: Vec::new(),
            reply_to: None,
        }
    }
}

/// Render-ready view of a message, produced by the store's projection.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub kind: MessageKind,
    /// Sender is someone other than the current subject.
    pub incoming: bool,
    /// Sender is the current subject. Mutually exclusive with `incoming`.
    pub outgoing: bool,
    /// Formatted timestamp for display (empty when the wire omitted it).
    pub time: String,
    pub attachments: Vec<Attachment>,
}
