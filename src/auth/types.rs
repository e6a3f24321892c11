//! Auth configuration types

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Authentication configuration for catalog requests
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Bearer token authentication (personal access tokens, cloud projects)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Session-based authentication (login endpoint)
    Session {
        /// Login endpoint URL
        login_url: String,
        /// Login request body
        login_body: Value,
        /// JSON pointer to the token in the login response (e.g. `/token`)
        token_pointer: String,
        /// Header name to use for the token
        token_header: String,
        /// Prefix for token value (e.g. `_dremio`)
        token_prefix: Option<String>,
    },
}

/// Session token obtained from a login call
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The session token
    pub token: String,
    /// When the login happened
    pub obtained_at: DateTime<Utc>,
}

impl CachedToken {
    /// Create a new cached token stamped with the current time
    pub fn new(token: String) -> Self {
        Self {
            token,
            obtained_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }

    #[test]
    fn test_cached_token_timestamp() {
        let before = Utc::now();
        let token = CachedToken::new("abc".to_string());
        assert_eq!(token.token, "abc");
        assert!(token.obtained_at >= before);
    }
}
