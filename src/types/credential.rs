//! Persisted credential for one platform

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Platform;
use super::wire::TokenResponse;

/// Seconds before `expires_at` at which a credential is already treated as expired
const EXPIRY_BUFFER_SECS: u64 = 60;

/// OAuth credential for a single platform
///
/// There is at most one live credential per platform. It is created by a
/// successful token exchange and destroyed by logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Platform this credential belongs to
    pub platform: Platform,

    /// Access token for API calls
    pub access_token: String,

    /// Refresh token, if the provider issued one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Unix timestamp when the access token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,

    /// Display name or handle of the authenticated user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Provider-side user id (LinkedIn subject, Twitter user id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

impl Credential {
    /// Create a credential with just an access token
    pub fn new(platform: Platform, access_token: impl Into<String>) -> Self {
        Self {
            platform,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            username: None,
            user_id: None,
        }
    }

    /// Build a credential from a token endpoint response
    #[must_use]
    pub fn from_token_response(platform: Platform, response: TokenResponse) -> Self {
        Self {
            platform,
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at: Some(now_secs().saturating_add(response.expires_in)),
            username: None,
            user_id: None,
        }
    }

    /// Check if the token is expired (with 60 second buffer)
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => now_secs().saturating_add(EXPIRY_BUFFER_SECS) >= expires_at,
            None => false,
        }
    }

    /// Whether the credential can be used for authenticated calls
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Get remaining validity duration, if known
    #[must_use]
    pub fn remaining_validity(&self) -> Option<Duration> {
        self.expires_at.and_then(|expires_at| {
            let now = now_secs();
            (expires_at > now).then(|| Duration::from_secs(expires_at - now))
        })
    }
}
