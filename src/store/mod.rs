//! Conversation store: canonical holder of conversations, the current
//! pointer, and the current-message projection.
//!
//! Three independent sources of truth feed this store: local optimistic
//! sends, socket-pushed events, and fetched snapshots. Every transition
//! here is responsible for merging them without duplication. All operations
//! are total over their declared inputs: malformed optional fields degrade to
//! defaults, and the only rejected transition (an unresolvable append target)
//! is a silent no-op.

pub mod selection;
pub mod timefmt;

use chrono::Utc;

use crate::models::{
    Conversation, MessageView, PresenceFact, RawMessage, RemoteConversation,
};

/// Client-side state for conversations, presence, and the current selection.
///
/// Single writer of canonical conversation/message state; everything else
/// reads it or requests transitions.
#[derive(Debug, Default)]
pub struct ChatStore {
    conversations: Vec<Conversation>,
    /// Snapshot pointer to the current conversation. Deliberately a copy, not
    /// an index: it may be stale or lose fields while the collection moves on,
    /// and the selection policy reconciles the two.
    current: Option<Conversation>,
    /// Render-ready projection of the current conversation's messages.
    current_messages: Vec<MessageView>,
    /// Selected room id, kept separately from the pointer for resilience:
    /// it stays valid while the pointer is null or stale.
    selected_room: Option<String>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn current_messages(&self) -> &[MessageView] {
        &self.current_messages
    }

    pub fn selected_room(&self) -> Option<&str> {
        self.selected_room.as_deref()
    }

    /// Record the selected room id (navigation). Does not touch the pointer;
    /// callers follow up with [`ChatStore::resolve_selection`].
    pub fn set_selected_room(&mut self, room: Option<String>) {
        self.selected_room = room;
    }

    /// Replace the whole collection from a fetched snapshot.
    ///
    /// Normalizes each remote record against `subject_id`. If no current
    /// pointer exists yet, seeds it from the first entry (first, not "most
    /// recent", a deliberate simplification). Idempotent: replaying the same
    /// input yields the same collection.
    pub fn replace_all(&mut self, records: &[RemoteConversation], subject_id: &str) {
        self.conversations = records
            .iter()
            .filter_map(|r| normalize(r, subject_id))
            .collect();

        if self.current.is_none() {
            if let Some(first) = self.conversations.first().cloned() {
                self.set_current(Some(first), subject_id);
            }
        }
    }

    /// Merge a single remote conversation record (server-pushed arrival).
    ///
    /// Locates an existing entry by id and replaces its derived fields in
    /// place, or appends when absent. Never produces two entries with the
    /// same id, and never drops an already-known counterpart id or message
    /// history just because the incoming record omitted them.
    pub fn upsert(&mut self, record: &RemoteConversation, subject_id: &str) {
        let Some(mut fresh) = normalize(record, subject_id) else {
            tracing::debug!("ignoring conversation record without id");
            return;
        };

        if let Some(existing) = self.conversations.iter_mut().find(|c| c.id == fresh.id) {
            if fresh.user_id.is_none() {
                fresh.user_id = existing.user_id.clone();
            }
            if fresh.messages.is_empty() && !existing.messages.is_empty() {
                fresh.messages = existing.messages.clone();
                fresh.last_message = existing.last_message.clone();
                fresh.last_message_at = existing.last_message_at;
            }
            fresh.unread = existing.unread;
            *existing = fresh;
        } else {
            self.conversations.push(fresh.clone());
            if self.current.is_none() {
                self.set_current(Some(fresh), subject_id);
            }
        }
    }

    /// Assign the current pointer directly and recompute the projection.
    ///
    /// No validation against the collection; callers may pass a conversation
    /// that has not landed in the collection yet (optimistic selection).
    /// Selecting a conversation marks it read.
    pub fn set_current(&mut self, conversation: Option<Conversation>, subject_id: &str) {
        match conversation {
            Some(mut conv) => {
                conv.unread = 0;
                if let Some(entry) = self.conversations.iter_mut().find(|c| c.id == conv.id) {
                    entry.unread = 0;
                }
                self.current_messages = Self::project_messages(&conv.messages, subject_id);
                self.current = Some(conv);
            }
            None => {
                self.current = None;
                self.current_messages.clear();
            }
        }
    }

    /// Re-derive the current pointer from (selected room, collection,
    /// previous snapshot). Invoked by the orchestration layer whenever any of
    /// those inputs changes; the policy itself lives in [`selection`] and is
    /// side-effect-free.
    pub fn resolve_selection(&mut self, subject_id: &str) {
        let resolved = selection::resolve_current(
            self.selected_room.as_deref(),
            &self.conversations,
            self.current.as_ref(),
        );
        if resolved != self.current {
            self.set_current(resolved, subject_id);
        }
    }

    /// Project a raw message sequence into render-ready views.
    ///
    /// Pure function of (messages, subject id): incoming/outgoing is derived
    /// per message by comparing the sender id to the subject id, timestamps
    /// are formatted for display, nothing else is consulted or mutated.
    pub fn project_messages(messages: &[RawMessage], subject_id: &str) -> Vec<MessageView> {
        messages.iter().map(|m| project_one(m, subject_id)).collect()
    }

    /// Append a message from any source (local optimistic send or server
    /// push), at most once per message id.
    ///
    /// The target is resolved by the message's conversation id, falling back
    /// to the current pointer; if neither resolves the append is silently
    /// rejected. A message id already present in either the projection or the
    /// target's raw sequence makes this a no-op, which is what lets the
    /// optimistic send and its server echo coexist.
    pub fn append_message(&mut self, msg: RawMessage, subject_id: &str) {
        let target_id = msg
            .conversation_id
            .clone()
            .filter(|id| self.conversations.iter().any(|c| &c.id == id))
            .or_else(|| self.current.as_ref().map(|c| c.id.clone()));

        let Some(target_id) = target_id else {
            tracing::debug!(message_id = %msg.id, "append rejected: no resolvable conversation");
            return;
        };

        let is_current = self.current.as_ref().is_some_and(|c| c.id == target_id);

        let duplicate = (is_current
            && (self.current_messages.iter().any(|v| v.id == msg.id)
                || self
                    .current
                    .as_ref()
                    .is_some_and(|c| c.messages.iter().any(|m| m.id == msg.id))))
            || self
                .conversations
                .iter()
                .find(|c| c.id == target_id)
                .is_some_and(|c| c.messages.iter().any(|m| m.id == msg.id));

        if duplicate {
            tracing::debug!(message_id = %msg.id, "duplicate message delivery ignored");
            return;
        }

        if let Some(entry) = self.conversations.iter_mut().find(|c| c.id == target_id) {
            entry.last_message = Some(msg.message.clone());
            entry.last_message_at = msg.created_at;
            if !is_current {
                entry.unread += 1;
            }
            entry.messages.push(msg.clone());
        }

        if is_current {
            if let Some(cur) = self.current.as_mut() {
                cur.last_message = Some(msg.message.clone());
                cur.last_message_at = msg.created_at;
                cur.messages.push(msg.clone());
            }
            self.current_messages.push(project_one(&msg, subject_id));
        }
    }

    /// Apply a presence broadcast to every matching collection entry and to
    /// the current pointer, in one transition, so the two cannot disagree.
    pub fn apply_presence(&mut self, fact: &PresenceFact) {
        let now = Utc::now();
        let last_seen_text = fact
            .last_seen
            .map(|ts| timefmt::relative_last_seen(ts, now));

        for conv in self
            .conversations
            .iter_mut()
            .filter(|c| c.user_id.as_deref() == Some(fact.user_id.as_str()))
        {
            conv.online = fact.status;
            conv.last_seen = last_seen_text.clone();
        }

        if let Some(cur) = self.current.as_mut() {
            if cur.user_id.as_deref() == Some(fact.user_id.as_str()) {
                cur.online = fact.status;
                cur.last_seen = last_seen_text;
            }
        }
    }

    /// Restore the initial empty state. Session teardown only.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Normalize a remote conversation record against the current subject id.
///
/// The counterpart is the first participant whose id is present and differs
/// from the subject. Missing optional fields degrade to defaults; a record
/// without an id is unusable and yields `None`.
fn normalize(record: &RemoteConversation, subject_id: &str) -> Option<Conversation> {
    let id = record.id.clone()?;

    let counterpart = record.participants.iter().find(|p| {
        p.keycloak_id.is_some() && p.keycloak_id.as_deref() != Some(subject_id)
    });

    let now = Utc::now();
    let (user_id, name, image, online, last_seen) = match counterpart {
        Some(p) => (
            p.keycloak_id.clone(),
            p.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            p.image.clone(),
            p.online,
            p.last_seen.map(|ts| timefmt::relative_last_seen(ts, now)),
        ),
        None => (None, "Unknown".to_string(), None, false, None),
    };

    let (last_message, last_message_at) = match record.messages.last() {
        Some(m) => (Some(m.message.clone()), m.created_at),
        None => (None, None),
    };

    Some(Conversation {
        id,
        user_id,
        name,
        image,
        online,
        last_seen,
        last_message,
        last_message_at,
        unread: 0,
        messages: record.messages.clone(),
    })
}

fn project_one(msg: &RawMessage, subject_id: &str) -> MessageView {
    let outgoing = msg.from.as_deref() == Some(subject_id);
    MessageView {
        id: msg.id.clone(),
        text: msg.message.clone(),
        kind: msg.kind,
        incoming: !outgoing,
        outgoing,
        time: timefmt::message_time(msg.created_at),
        attachments: msg.attachments.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, Participant};

    fn participant(keycloak_id: Option<&str>) -> Participant {
        Participant {
            keycloak_id: keycloak_id.map(String::from),
            name: keycloak_id.map(|id| format!("name-{}", id)),
            image: None,
            online: false,
            last_seen: None,
        }
    }

    fn remote(id: &str, participants: &[Option<&str>], messages: Vec<RawMessage>) -> RemoteConversation {
        RemoteConversation {
            id: Some(id.to_string()),
            participants: participants.iter().map(|p| participant(*p)).collect(),
            messages,
        }
    }

    fn text_msg(id: &str, from: &str, conversation_id: Option<&str>) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            message: format!("body-{}", id),
            kind: MessageKind::Text,
            from: Some(from.to_string()),
            to: None,
            conversation_id: conversation_id.map(String::from),
            created_at: None,
            attachments: Vec::new(),
            reply_to: None,
        }
    }

    #[test]
    fn test_replace_all_normalizes_and_seeds_pointer() {
        // Fetch scenario: one record, subject is u2, counterpart must be u1
        // and the pointer must equal the normalized entry.
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1"), Some("u2")], vec![])], "u2");

        assert_eq!(store.conversations().len(), 1);
        let entry = &store.conversations()[0];
        assert_eq!(entry.id, "c1");
        assert_eq!(entry.user_id.as_deref(), Some("u1"));

        assert_eq!(store.current().unwrap(), entry);
    }

    #[test]
    fn test_replace_all_is_idempotent() {
        let records = vec![
            remote("c1", &[Some("u1"), Some("u2")], vec![text_msg("m1", "u1", Some("c1"))]),
            remote("c2", &[Some("u3"), Some("u2")], vec![]),
        ];

        let mut store = ChatStore::new();
        store.replace_all(&records, "u2");
        let first = store.conversations().to_vec();

        store.replace_all(&records, "u2");
        assert_eq!(store.conversations(), first.as_slice());
    }

    #[test]
    fn test_replace_all_does_not_move_existing_pointer() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");
        store.replace_all(
            &[
                remote("c9", &[Some("u9")], vec![]),
                remote("c1", &[Some("u1")], vec![]),
            ],
            "u2",
        );
        // Refresh never implicitly re-seeds or nulls the pointer.
        assert_eq!(store.current().unwrap().id, "c1");
    }

    #[test]
    fn test_replace_all_skips_record_without_id() {
        let mut store = ChatStore::new();
        let record = RemoteConversation {
            id: None,
            participants: vec![participant(Some("u1"))],
            messages: vec![],
        };
        store.replace_all(&[record], "u2");
        assert!(store.conversations().is_empty());
        assert!(store.current().is_none());
    }

    #[test]
    fn test_upsert_replaces_in_place_without_duplicating() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");

        let mut updated = remote("c1", &[Some("u1")], vec![]);
        updated.participants[0].online = true;
        store.upsert(&updated, "u2");

        assert_eq!(store.conversations().len(), 1);
        assert!(store.conversations()[0].online);
    }

    #[test]
    fn test_upsert_appends_new_and_seeds_pointer() {
        let mut store = ChatStore::new();
        store.upsert(&remote("c1", &[Some("u1")], vec![]), "u2");
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.current().unwrap().id, "c1");
    }

    #[test]
    fn test_upsert_never_drops_known_counterpart_id() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");

        // Partial record: no usable participants.
        store.upsert(&remote("c1", &[], vec![]), "u2");
        assert_eq!(store.conversations()[0].user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_upsert_keeps_history_when_record_omits_messages() {
        let mut store = ChatStore::new();
        store.replace_all(
            &[remote("c1", &[Some("u1")], vec![text_msg("m1", "u1", Some("c1"))])],
            "u2",
        );
        store.upsert(&remote("c1", &[Some("u1")], vec![]), "u2");
        assert_eq!(store.conversations()[0].messages.len(), 1);
    }

    #[test]
    fn test_append_message_dedupes_by_id() {
        // Optimistic send followed by the server echo with the same id.
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1"), Some("u2")], vec![])], "u2");

        store.append_message(text_msg("m1", "u2", Some("c1")), "u2");
        store.append_message(text_msg("m1", "u2", Some("c1")), "u2");

        assert_eq!(store.conversations()[0].messages.len(), 1);
        assert_eq!(store.current_messages().len(), 1);
        assert_eq!(store.current().unwrap().messages.len(), 1);
    }

    #[test]
    fn test_append_message_falls_back_to_current_pointer() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");

        // Unknown conversation id: falls back to the current conversation.
        store.append_message(text_msg("m1", "u1", Some("nope")), "u2");
        assert_eq!(store.conversations()[0].messages.len(), 1);
        assert_eq!(store.current_messages().len(), 1);
    }

    #[test]
    fn test_append_message_unresolvable_is_silent_noop() {
        let mut store = ChatStore::new();
        store.append_message(text_msg("m1", "u1", Some("nope")), "u2");
        assert!(store.conversations().is_empty());
        assert!(store.current_messages().is_empty());
    }

    #[test]
    fn test_append_to_non_current_increments_unread() {
        let mut store = ChatStore::new();
        store.replace_all(
            &[
                remote("c1", &[Some("u1")], vec![]),
                remote("c2", &[Some("u3")], vec![]),
            ],
            "u2",
        );
        assert_eq!(store.current().unwrap().id, "c1");

        store.append_message(text_msg("m1", "u3", Some("c2")), "u2");
        let c2 = store.conversations().iter().find(|c| c.id == "c2").unwrap();
        assert_eq!(c2.unread, 1);
        assert_eq!(c2.last_message.as_deref(), Some("body-m1"));
        // The projection belongs to c1 and must stay untouched.
        assert!(store.current_messages().is_empty());
    }

    #[test]
    fn test_set_current_clears_unread() {
        let mut store = ChatStore::new();
        store.replace_all(
            &[
                remote("c1", &[Some("u1")], vec![]),
                remote("c2", &[Some("u3")], vec![]),
            ],
            "u2",
        );
        store.append_message(text_msg("m1", "u3", Some("c2")), "u2");

        let c2 = store.conversations().iter().find(|c| c.id == "c2").cloned().unwrap();
        store.set_current(Some(c2), "u2");

        assert_eq!(store.current().unwrap().unread, 0);
        assert_eq!(
            store.conversations().iter().find(|c| c.id == "c2").unwrap().unread,
            0
        );
        assert_eq!(store.current_messages().len(), 1);
    }

    #[test]
    fn test_projection_derives_origin_flags() {
        let msgs = vec![text_msg("m1", "u2", Some("c1")), text_msg("m2", "u1", Some("c1"))];
        let views = ChatStore::project_messages(&msgs, "u2");

        assert!(views[0].outgoing && !views[0].incoming);
        assert!(views[1].incoming && !views[1].outgoing);
    }

    #[test]
    fn test_projection_is_pure() {
        let msgs = vec![text_msg("m1", "u2", Some("c1"))];
        let a = ChatStore::project_messages(&msgs, "u2");
        let b = ChatStore::project_messages(&msgs, "u2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_presence_keeps_collection_and_pointer_in_agreement() {
        let mut store = ChatStore::new();
        store.replace_all(
            &[
                remote("c1", &[Some("u1")], vec![]),
                remote("c2", &[Some("u1")], vec![]),
            ],
            "u2",
        );

        let fact = PresenceFact {
            user_id: "u1".to_string(),
            status: true,
            last_seen: Some("2024-06-01T12:00:00Z".parse().unwrap()),
        };
        store.apply_presence(&fact);

        let texts: Vec<_> = store
            .conversations()
            .iter()
            .map(|c| (c.online, c.last_seen.clone()))
            .collect();
        assert_eq!(texts[0], texts[1]);
        assert!(texts[0].0);

        let cur = store.current().unwrap();
        assert_eq!(cur.online, texts[0].0);
        assert_eq!(cur.last_seen, texts[0].1);
    }

    #[test]
    fn test_presence_for_unknown_user_is_noop() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");
        let before = store.conversations().to_vec();

        store.apply_presence(&PresenceFact {
            user_id: "stranger".to_string(),
            status: true,
            last_seen: None,
        });
        assert_eq!(store.conversations(), before.as_slice());
    }

    #[test]
    fn test_resolve_selection_recovers_lost_counterpart() {
        let mut store = ChatStore::new();
        store.replace_all(&[remote("c1", &[Some("u9")], vec![])], "u2");

        // Simulate field loss on the pointer (e.g. a stale snapshot).
        let mut damaged = store.current().unwrap().clone();
        damaged.user_id = None;
        store.set_current(Some(damaged), "u2");
        assert!(store.current().unwrap().user_id.is_none());

        store.resolve_selection("u2");
        assert_eq!(store.current().unwrap().user_id.as_deref(), Some("u9"));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut store = ChatStore::new();
        store.set_selected_room(Some("c1".to_string()));
        store.replace_all(&[remote("c1", &[Some("u1")], vec![])], "u2");
        store.reset();

        assert!(store.conversations().is_empty());
        assert!(store.current().is_none());
        assert!(store.current_messages().is_empty());
        assert!(store.selected_room().is_none());
    }
}
