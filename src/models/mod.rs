//! Data models shared across the store, socket, and API layers.

pub mod conversation;
pub mod message;
pub mod presence;

pub use conversation::{Conversation, Participant, RemoteConversation};
pub use message::{Attachment, MessageKind, MessageView, RawMessage};
pub use presence::PresenceFact;
