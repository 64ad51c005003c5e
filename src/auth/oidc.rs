//! OAuth2 device authorization grant against the OIDC provider.

use anyhow::{Context, Result};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, ClientId, DeviceAuthorizationUrl, RefreshToken, Scope,
    StandardDeviceAuthorizationResponse, TokenResponse, TokenUrl,
};

use super::{tokens, AuthConfig, TokenStore};
use crate::config::Config;

fn build_client(auth: &AuthConfig) -> Result<BasicClient> {
    let client = BasicClient::new(
        ClientId::new(auth.client_id.clone()),
        None,
        AuthUrl::new(auth.auth_url())?,
        Some(TokenUrl::new(auth.token_url())?),
    )
    .set_device_authorization_url(DeviceAuthorizationUrl::new(auth.device_url())?);
    Ok(client)
}

/// Write the granted tokens and the token's subject id into the config.
fn persist_tokens(config: &mut Config, response: &BasicTokenResponse) -> Result<()> {
    let access_token = response.access_token().secret().to_string();
    config.set_subject_id(tokens::subject_claim(&access_token));
    config.set_access_token(access_token, response.expires_in().map(|d| d.as_secs()));
    if let Some(rt) = response.refresh_token() {
        config.set_refresh_token(rt.secret().to_string());
    }
    config.save()
}

/// Refresh the access token using the stored refresh token.
/// Returns Ok(true) if a refresh happened, Ok(false) if none was possible.
pub async fn refresh() -> Result<bool> {
    let mut config = Config::load()?;
    let Some(refresh_token) = config.get_refresh_token() else {
        return Ok(false);
    };

    let auth = AuthConfig::from_config(&config);
    let client = build_client(&auth)?;

    tracing::info!("Refreshing access token...");
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .add_scope(Scope::new(auth.scope.clone()))
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .context("Access token refresh failed")?;

    persist_tokens(&mut config, &response)?;
    tracing::info!("Access token refreshed");
    Ok(true)
}

/// Attempt to satisfy a non-forced login from cached credentials.
/// Returns true when no interactive flow is needed.
async fn cached_login() -> Result<bool> {
    let config = Config::load()?;
    let Some(token) = config.get_access_token() else {
        return Ok(false);
    };

    if !token.is_expired() {
        println!("Already logged in. Use --force to re-authenticate.");
        return Ok(true);
    }

    if config.get_refresh_token().is_some() {
        tracing::info!("Access token expired, attempting refresh...");
        match refresh().await {
            Ok(true) => {
                println!("Token refreshed successfully.");
                return Ok(true);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Refresh failed, falling back to device code: {:#}", e);
            }
        }
    }
    Ok(false)
}

/// Perform the device authorization grant login flow.
pub async fn login(force: bool) -> Result<()> {
    if !force && cached_login().await? {
        return Ok(());
    }

    let config = Config::load()?;
    let auth = AuthConfig::from_config(&config);
    let client = build_client(&auth)?;

    tracing::info!("Requesting device authorization...");
    let device_auth: StandardDeviceAuthorizationResponse = client
        .exchange_device_code()?
        .add_scope(Scope::new(auth.scope.clone()))
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .context("Device authorization request failed")?;

    println!();
    println!(
        "To sign in, visit: {}",
        device_auth.verification_uri().as_str()
    );
    println!("Enter code:        {}", device_auth.user_code().secret());
    println!();

    tracing::info!("Waiting for authentication...");
    let response = client
        .exchange_device_access_token(&device_auth)
        .request_async(oauth2::reqwest::async_http_client, tokio::time::sleep, None)
        .await
        .context("Device code exchange failed")?;

    let mut config = Config::load()?;
    persist_tokens(&mut config, &response)?;

    match config.subject_id() {
        Some(sub) => println!("Login successful (subject {}).", sub),
        None => println!("Login successful, but the token carries no subject id."),
    }
    Ok(())
}

/// Clear stored credentials.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.clear_tokens();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Display the current authentication state.
pub async fn status() -> Result<()> {
    let config = Config::load()?;

    match config.get_access_token() {
        Some(token) if !token.is_expired() => {
            println!("Access token: valid");
            if let Some(exp) = token.expires_at {
                println!("  expires_at: {}", exp);
            }
        }
        Some(_) => println!("Access token: expired"),
        None => println!("Access token: none"),
    }

    println!(
        "Refresh tok:  {}",
        if config.get_refresh_token().is_some() {
            "present"
        } else {
            "none"
        }
    );
    println!(
        "Subject id:   {}",
        config.subject_id().as_deref().unwrap_or("unknown")
    );

    if config.get_access_token().is_none() {
        println!("\nRun 'dmchat login' to authenticate.");
    }

    Ok(())
}
