//! Configuration and credential storage.
//!
//! One TOML file under the platform config directory holds endpoint
//! overrides and the stored credentials. It is written with 0600
//! permissions: the refresh token in it is a long-lived secret.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::auth::{StoredToken, TokenStore};

/// Default identity-provider realm URL (Keycloak-style issuer).
pub const DEFAULT_ISSUER: &str = "https://id.example.com/realms/chat";
/// Default OAuth2 public client id.
pub const DEFAULT_CLIENT_ID: &str = "dmchat";
/// Default REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://chat.example.com";
/// Default realtime socket endpoint.
pub const DEFAULT_SOCKET_URL: &str = "wss://chat.example.com/socket";

/// On-disk configuration. Every endpoint field is optional; accessors fall
/// back to the defaults above.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub api_base: Option<String>,
    pub socket_url: Option<String>,
    pub access_token: Option<StoredToken>,
    pub refresh_token: Option<String>,
    /// Subject id from the last login (access token `sub` claim).
    pub subject_id: Option<String>,
}

impl Config {
    fn file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "dmchat", "dmchat")
            .context("no config directory available on this platform")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let raw = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(&path, raw).with_context(|| format!("writing {}", path.display()))?;

        // The file carries credentials: owner-only access.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("restricting permissions on {}", path.display()))?;
        }

        Ok(())
    }

    pub fn issuer(&self) -> String {
        self.issuer.clone().unwrap_or_else(|| DEFAULT_ISSUER.to_string())
    }

    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string())
    }

    pub fn api_base(&self) -> String {
        self.api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    pub fn socket_url(&self) -> String {
        self.socket_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SOCKET_URL.to_string())
    }

    pub fn subject_id(&self) -> Option<String> {
        self.subject_id.clone()
    }

    pub fn set_subject_id(&mut self, subject_id: Option<String>) {
        self.subject_id = subject_id;
    }
}

impl TokenStore for Config {
    fn get_access_token(&self) -> Option<StoredToken> {
        self.access_token.clone()
    }

    fn set_access_token(&mut self, token: String, expires_in: Option<u64>) {
        self.access_token = Some(StoredToken::new(token, expires_in));
    }

    fn get_refresh_token(&self) -> Option<String> {
        self.refresh_token.clone()
    }

    fn set_refresh_token(&mut self, token: String) {
        self.refresh_token = Some(token);
    }

    fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        // A subject id without credentials is stale.
        self.subject_id = None;
    }
}
