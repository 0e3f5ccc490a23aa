//! Error types for Social Linkup

use crate::auth::StoreError;
use crate::types::Platform;
use thiserror::Error;

/// Main error type for Social Linkup
#[derive(Error, Debug)]
pub enum LinkupError {
    /// Missing or invalid client credentials configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Callback `state` did not match the pending authorization request
    #[error("State mismatch in OAuth callback (possible CSRF)")]
    StateMismatch {
        /// State of the pending request, if one was pending
        expected: Option<String>,
        /// State carried by the callback, if any
        received: Option<String>,
    },

    /// Callback carried no authorization code (consent denied or provider error)
    #[error("OAuth callback carried no authorization code{}", format_callback_error(.error, .description))]
    CallbackMissingCode {
        /// Provider `error` parameter
        error: Option<String>,
        /// Provider `error_description` parameter
        description: Option<String>,
    },

    /// Code-for-token exchange failed (network or decode failure)
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Authenticated call attempted without a usable access token
    #[error("Not authenticated with {0}")]
    NotAuthenticated(Platform),

    /// Provider returned a non-2xx or undecodable response
    #[error("Provider request failed (status {status}): {body}")]
    ProviderRequestFailed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// User closed the consent surface
    #[error("Authentication cancelled by user")]
    ConsentCancelled,

    /// Consent surface failed to produce a callback
    #[error("Consent surface error: {0}")]
    Consent(String),

    /// Callback URL could not be parsed
    #[error("Invalid callback URL: {0}")]
    InvalidCallback(String),

    /// Caller supplied invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential store failure
    #[error("Credential store error: {0}")]
    Storage(#[from] StoreError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_callback_error(error: &Option<String>, description: &Option<String>) -> String {
    match (error, description) {
        (Some(e), Some(d)) => format!(": {e} ({d})"),
        (Some(e), None) => format!(": {e}"),
        (None, Some(d)) => format!(": {d}"),
        (None, None) => String::new(),
    }
}

/// Result type alias for Social Linkup operations
pub type Result<T> = std::result::Result<T, LinkupError>;

impl LinkupError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a state mismatch error
    pub fn state_mismatch(expected: Option<String>, received: Option<String>) -> Self {
        Self::StateMismatch { expected, received }
    }

    /// Create a token exchange error
    pub fn token_exchange(msg: impl Into<String>) -> Self {
        Self::TokenExchangeFailed(msg.into())
    }

    /// Create a provider request error
    pub fn provider_request(status: u16, body: impl Into<String>) -> Self {
        Self::ProviderRequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Create a consent surface error
    pub fn consent(msg: impl Into<String>) -> Self {
        Self::Consent(msg.into())
    }

    /// Create an invalid callback error
    pub fn invalid_callback(msg: impl Into<String>) -> Self {
        Self::InvalidCallback(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from the authorization redirect rather than the network.
    ///
    /// Flow errors leave the user able to restart the login from scratch.
    #[must_use]
    pub fn is_flow_error(&self) -> bool {
        matches!(
            self,
            Self::StateMismatch { .. }
                | Self::CallbackMissingCode { .. }
                | Self::ConsentCancelled
                | Self::InvalidCallback(_)
        )
    }
}
