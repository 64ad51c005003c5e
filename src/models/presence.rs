//! Presence models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A presence broadcast, independent of conversation/message flow.
///
/// Applied by identifier match across both the conversation collection and
/// the current pointer so the two never diverge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceFact {
    pub user_id: String,
    /// Online flag (wire name `status`).
    pub status: bool,
    pub last_seen: Option<DateTime<Utc>>,
}
