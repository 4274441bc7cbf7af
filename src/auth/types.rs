//! Auth configuration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication configuration
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Pre-issued access token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 Resource Owner Password flow
    Oauth2Password {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Username
        username: String,
        /// Password (with security token appended, where the service wants one)
        password: String,
    },

    /// OAuth2 Client Credentials flow
    Oauth2ClientCredentials {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Requested scopes
        #[serde(default)]
        scopes: Vec<String>,
    },

    /// OAuth2 Refresh Token flow
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },
}

impl AuthConfig {
    /// Whether this scheme obtains tokens from a token endpoint
    pub fn uses_token_endpoint(&self) -> bool {
        matches!(
            self,
            Self::Oauth2Password { .. }
                | Self::Oauth2ClientCredentials { .. }
                | Self::Oauth2Refresh { .. }
        )
    }

    /// Short name of the scheme, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer { .. } => "bearer",
            Self::Oauth2Password { .. } => "oauth2_password",
            Self::Oauth2ClientCredentials { .. } => "oauth2_client_credentials",
            Self::Oauth2Refresh { .. } => "oauth2_refresh",
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oauth2Password {
                token_url,
                client_id,
                username,
                ..
            } => f
                .debug_struct("Oauth2Password")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Oauth2ClientCredentials {
                token_url,
                client_id,
                scopes,
                ..
            } => f
                .debug_struct("Oauth2ClientCredentials")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .field("scopes", scopes)
                .finish_non_exhaustive(),
            Self::Oauth2Refresh {
                token_url,
                client_id,
                ..
            } => f
                .debug_struct("Oauth2Refresh")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}
