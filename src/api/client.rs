//! Authenticated HTTP client for the chat service REST API
//!
//! Wraps reqwest::Client with bearer-token injection and automatic refresh.

use anyhow::{bail, Result};

use crate::auth::Session;

/// Authenticated client for the chat service endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    session: Session,
}

impl ApiClient {
    /// Load the session and build the client. Attempts a token refresh if the
    /// credential is expired or about to expire.
    pub async fn new() -> Result<Self> {
        let mut session = Session::load()?;

        if !session.authenticated() {
            match session.refresh(0).await {
                Ok(_) => {}
                Err(e) => {
                    bail!("Token refresh failed: {:#}. Run 'dmchat login'.", e);
                }
            }
        }

        Ok(Self {
            http: reqwest::Client::new(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// GET request against the API base (bearer auth).
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        use anyhow::Context;

        let token = self.session.bearer_token()?;
        let url = format!("{}{}", self.session.api_base(), path);
        tracing::debug!("API GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .with_context(|| format!("API GET {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'dmchat login'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
