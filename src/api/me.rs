//! User profile and directory endpoints

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::ApiClient;

/// User profile record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub keycloak_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Fetch the authenticated user's profile.
pub async fn whoami_data(client: &ApiClient) -> Result<Profile> {
    let subject_id = client
        .session()
        .subject_id()
        .context("No subject id recorded. Run 'dmchat login'.")?;

    let resp = client.get(&format!("/api/users/{}", subject_id)).await?;
    resp.json().await.context("Failed to parse profile response")
}

/// Fetch the user directory.
pub async fn fetch_users(client: &ApiClient) -> Result<Vec<Profile>> {
    let resp = client.get("/api/users").await?;
    resp.json().await.context("Failed to parse users response")
}

/// List known users (prints to stdout).
pub async fn list_users(limit: usize) -> Result<()> {
    let client = ApiClient::new().await?;
    let users = fetch_users(&client).await?;

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    for user in users.iter().take(limit) {
        println!(
            "{:<36} {}",
            user.keycloak_id.as_deref().unwrap_or("(unknown)"),
            user.name.as_deref().unwrap_or("(unnamed)")
        );
    }

    Ok(())
}

/// Show current user info (prints to stdout).
pub async fn whoami() -> Result<()> {
    let client = ApiClient::new().await?;
    let profile = whoami_data(&client).await?;

    println!("Name:    {}", profile.name.as_deref().unwrap_or("(unknown)"));
    println!("Email:   {}", profile.email.as_deref().unwrap_or("(none)"));
    println!(
        "Subject: {}",
        profile.keycloak_id.as_deref().unwrap_or("(unknown)")
    );

    Ok(())
}
