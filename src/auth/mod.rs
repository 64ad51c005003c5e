//! Authentication against the external OIDC identity provider.
//!
//! Implements the OAuth2 device authorization grant for login and the refresh
//! grant for silent renewal. The provider itself is an external collaborator;
//! this module only brokers credentials and exposes the session adapter.

pub mod oidc;
pub mod session;
pub mod tokens;

pub use oidc::{login, logout, status};
pub use session::Session;
pub use tokens::{StoredToken, TokenStore};

use crate::config::Config;

/// Identity-provider endpoints and client registration.
pub struct AuthConfig {
    /// OIDC issuer (realm) URL
    pub issuer: String,
    /// OAuth2 client id (public client)
    pub client_id: String,
    /// Requested scopes
    pub scope: String,
}

impl AuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            issuer: config.issuer(),
            client_id: config.client_id(),
            scope: "openid offline_access".to_string(),
        }
    }

    pub fn auth_url(&self) -> String {
        format!("{}/protocol/openid-connect/auth", self.issuer)
    }

    pub fn token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.issuer)
    }

    pub fn device_url(&self) -> String {
        format!("{}/protocol/openid-connect/auth/device", self.issuer)
    }
}
