//! REST collaborator: conversation/user/profile endpoints.
//!
//! External to the core; consumed via authenticated requests. Snapshots
//! fetched here flow into the conversation store through `replace_all`.

pub mod client;
pub mod conversations;
pub mod me;

pub use client::ApiClient;
pub use conversations::{fetch_conversations, list_chats, read_messages};
pub use me::{fetch_users, list_users, whoami, whoami_data, Profile};
