//! Authenticator implementation
//!
//! Handles applying authentication to requests and performing the login
//! that produces a session token.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached session token
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for login requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client: Client::new(),
        }
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),

            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),

            AuthConfig::Session {
                token_header,
                token_prefix,
                ..
            } => {
                let token = self.get_or_login().await?;
                let value = format!("{}{token}", token_prefix.as_deref().unwrap_or(""));
                Ok(req.header(token_header.as_str(), value))
            }
        }
    }

    /// Log in eagerly so the first catalog call does not pay for it
    ///
    /// A no-op for auth types without a login step.
    pub async fn login(&self) -> Result<()> {
        if matches!(self.config, AuthConfig::Session { .. }) {
            self.get_or_login().await?;
        }
        Ok(())
    }

    /// Get the cached session token, logging in when there is none
    async fn get_or_login(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have logged in while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            return Ok(token.token.clone());
        }

        let new_token = self.fetch_session_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Fetch session token by logging in
    async fn fetch_session_token(&self) -> Result<CachedToken> {
        let AuthConfig::Session {
            login_url,
            login_body,
            token_pointer,
            ..
        } = &self.config
        else {
            return Err(Error::auth("Login not supported for this auth type"));
        };

        debug!("Logging in at {login_url}");
        let response = self
            .http_client
            .post(login_url)
            .json(login_body)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Login request failed with status {status}: {body}"
            )));
        }

        let body: Value = response.json().await.map_err(Error::Http)?;

        let token = extract_pointer(&body, token_pointer).ok_or_else(|| {
            Error::auth(format!("Could not extract token from path: {token_pointer}"))
        })?;

        info!("Catalog session established");
        Ok(CachedToken::new(token))
    }

    /// Whether a session token is currently cached
    pub async fn has_session(&self) -> bool {
        self.cached_token.read().await.is_some()
    }

    /// Clear the cached token (forces a new login on next use)
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Extract a scalar from JSON using a JSON pointer (`/data/token`)
///
/// A bare key (`token`) is treated as `/token`.
pub fn extract_pointer(value: &Value, pointer: &str) -> Option<String> {
    let found = if pointer.starts_with('/') {
        value.pointer(pointer)
    } else {
        value.pointer(&format!("/{pointer}"))
    }?;

    match found {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
