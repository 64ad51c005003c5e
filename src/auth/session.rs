//! Identity session adapter.
//!
//! Single-instance wrapper over the stored OIDC credentials, constructed at
//! startup and injected at the store/channel boundary. The provider issues
//! and refreshes credentials; this adapter only answers "who am I" and
//! "what is my current credential" and carries the refresh obligation.

use anyhow::{bail, Context, Result};

use super::{oidc, tokens, TokenStore};
use crate::config::Config;

pub struct Session {
    config: Config,
}

impl Session {
    /// Load the session from the stored configuration.
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self { config })
    }

    /// Whether a usable credential is currently held.
    pub fn authenticated(&self) -> bool {
        self.config
            .get_access_token()
            .is_some_and(|t| !t.is_expired())
    }

    /// The authenticated user's identity-provider subject id.
    pub fn subject_id(&self) -> Option<String> {
        self.config.subject_id().or_else(|| {
            self.config
                .get_access_token()
                .and_then(|t| tokens::subject_claim(&t.token))
        })
    }

    /// The current bearer credential.
    pub fn bearer_token(&self) -> Result<String> {
        let token = self
            .config
            .get_access_token()
            .context("Not logged in. Run 'dmchat login' first.")?;
        if token.is_expired() {
            bail!("Access token expired. Run 'dmchat login'.");
        }
        Ok(token.token)
    }

    /// REST API base URL for this session.
    pub fn api_base(&self) -> String {
        self.config.api_base()
    }

    /// Realtime socket endpoint for this session.
    pub fn socket_url(&self) -> String {
        self.config.socket_url()
    }

    /// Refresh the credential when fewer than `threshold_secs` of validity
    /// remain. Returns Ok(true) when a refresh happened. A refresh failure
    /// propagates so the caller can surface a re-login requirement.
    pub async fn refresh(&mut self, threshold_secs: u64) -> Result<bool> {
        let needs_refresh = self
            .config
            .get_access_token()
            .map_or(true, |t| t.expires_within(threshold_secs));

        if !needs_refresh {
            return Ok(false);
        }

        if !oidc::refresh().await? {
            bail!("No refresh token available. Run 'dmchat login'.");
        }

        // Pick up the tokens the refresh persisted.
        self.config = Config::load()?;
        Ok(true)
    }
}
