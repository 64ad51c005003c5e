//! Stored credentials and their expiry bookkeeping.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use serde::{Deserialize, Serialize};

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// An access token together with its absolute expiry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        Self {
            token,
            expires_at: expires_in_secs.map(|secs| unix_now() + secs),
        }
    }

    /// Whether fewer than `threshold_secs` of validity remain. A token
    /// without a recorded expiry never reports as expiring.
    pub fn expires_within(&self, threshold_secs: u64) -> bool {
        self.expires_at
            .is_some_and(|exp| unix_now() + threshold_secs >= exp)
    }

    pub fn is_expired(&self) -> bool {
        // 5 minute safety margin
        self.expires_within(300)
    }
}

/// Credential storage backend.
pub trait TokenStore {
    fn get_access_token(&self) -> Option<StoredToken>;
    fn set_access_token(&mut self, token: String, expires_in: Option<u64>);
    fn get_refresh_token(&self) -> Option<String>;
    fn set_refresh_token(&mut self, token: String);
    fn clear_tokens(&mut self);
}

/// Extract the `sub` claim from a JWT access token without verifying the
/// signature. Verification is the identity provider's job; the client only
/// needs the subject id to tell incoming from outgoing messages.
pub fn subject_claim(jwt: &str) -> Option<String> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("sub").and_then(|s| s.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jwt(claims: serde_json::Value) -> String {
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}",
            engine.encode(r#"{"alg":"RS256"}"#),
            engine.encode(claims.to_string()),
            engine.encode("sig")
        )
    }

    #[test]
    fn test_subject_claim_extraction() {
        let jwt = fake_jwt(serde_json::json!({ "sub": "u2", "aud": "chat" }));
        assert_eq!(subject_claim(&jwt).as_deref(), Some("u2"));
    }

    #[test]
    fn test_subject_claim_garbage_is_none() {
        assert!(subject_claim("not-a-jwt").is_none());
        assert!(subject_claim("a.b.c").is_none());
        let jwt = fake_jwt(serde_json::json!({ "aud": "chat" }));
        assert!(subject_claim(&jwt).is_none());
    }

    #[test]
    fn test_expires_within() {
        let token = StoredToken::new("t".to_string(), Some(600));
        assert!(!token.expires_within(60));
        assert!(token.expires_within(900));

        // No expiry recorded: treated as non-expiring.
        let token = StoredToken::new("t".to_string(), None);
        assert!(!token.is_expired());
    }
}
