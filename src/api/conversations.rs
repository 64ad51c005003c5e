//! Conversation endpoints of the REST collaborator

use anyhow::{Context, Result};

use super::client::ApiClient;
use crate::models::RemoteConversation;
use crate::store::ChatStore;

/// Fetch the authenticated user's conversations.
pub async fn fetch_conversations(client: &ApiClient) -> Result<Vec<RemoteConversation>> {
    let resp = client.get("/api/conversations").await?;
    resp.json()
        .await
        .context("Failed to parse conversations response")
}

/// List recent conversations (prints to stdout).
pub async fn list_chats(limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let subject_id = client
        .session()
        .subject_id()
        .context("No subject id recorded. Run 'dmchat login'.")?;

    let records = fetch_conversations(&client).await?;
    let mut store = ChatStore::new();
    store.replace_all(&records, &subject_id);

    println!("\nConversations:");
    println!("{:-<60}", "");

    if store.conversations().is_empty() {
        println!("  (no conversations found)");
        return Ok(());
    }

    for conv in store.conversations().iter().take(limit) {
        let presence = if conv.online {
            "online".to_string()
        } else {
            conv.last_seen.clone().unwrap_or_else(|| "offline".to_string())
        };
        println!("{}  [{}]", conv.name, presence);
        println!("  ID: {}", conv.id);
        if let Some(ref preview) = conv.last_message {
            if !preview.trim().is_empty() {
                println!("  Last: {}", preview.trim());
            }
        }
        println!();
    }

    Ok(())
}

/// Read messages from one conversation (prints to stdout).
pub async fn read_messages(room_id: &str, limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let subject_id = client
        .session()
        .subject_id()
        .context("No subject id recorded. Run 'dmchat login'.")?;

    let records = fetch_conversations(&client).await?;
    let record = records
        .iter()
        .find(|r| r.id.as_deref() == Some(room_id))
        .with_context(|| format!("No conversation with id {}", room_id))?;

    let views = ChatStore::project_messages(&record.messages, &subject_id);
    if views.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    let skip = views.len().saturating_sub(limit);
    for view in views.iter().skip(skip) {
        let arrow = if view.outgoing { ">" } else { "<" };
        println!("[{}] {} {}", view.time, arrow, view.text);
    }

    Ok(())
}
