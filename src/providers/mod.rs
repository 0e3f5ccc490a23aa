//! Provider adapters
//!
//! Each adapter supplies the endpoints, scopes and response shapes of one
//! platform, and performs the authenticated profile and post calls. Every call
//! is a single attempt: there is no retry and no backoff.

mod linkedin;
mod twitter;

pub use linkedin::{LinkedInAdapter, LinkedInEndpoints};
pub use twitter::{TwitterAdapter, TwitterEndpoints};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::auth::AuthConfig;
use crate::error::{LinkupError, Result};
use crate::types::{Credential, Platform, PostResult, Profile};

/// Capability set shared by every platform
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Platform this adapter talks to
    fn platform(&self) -> Platform;

    /// Parameters for the authorization flow
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when the client credentials are missing or invalid.
    fn build_auth_config(&self) -> Result<AuthConfig>;

    /// Fetch the authenticated user's identity
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;

    /// Publish `text` on behalf of the credential's owner
    async fn post_content(&self, credential: &Credential, text: &str) -> Result<PostResult>;
}

/// Fail with `NotAuthenticated` unless a token is present
pub(crate) fn require_token(platform: Platform, access_token: &str) -> Result<()> {
    if access_token.trim().is_empty() {
        return Err(LinkupError::NotAuthenticated(platform));
    }
    Ok(())
}

/// Fail with `InvalidInput` for blank post text
pub(crate) fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(LinkupError::invalid_input("post text is empty"));
    }
    Ok(())
}

/// Successful response body together with the headers it came with
pub(crate) struct CheckedResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
}

impl CheckedResponse {
    /// Decode the body, treating a decode failure like a failed request
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|_| LinkupError::provider_request(self.status, self.body.clone()))
    }
}

/// Read a response, turning non-2xx statuses into `ProviderRequestFailed`
pub(crate) async fn check_response(response: reqwest::Response) -> Result<CheckedResponse> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(LinkupError::provider_request(status.as_u16(), body));
    }

    Ok(CheckedResponse {
        status: status.as_u16(),
        headers,
        body,
    })
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parse an endpoint string into a URL, as a configuration error on failure
pub(crate) fn parse_endpoint(name: &str, value: &str) -> Result<url::Url> {
    url::Url::parse(value)
        .map_err(|e| LinkupError::configuration(format!("invalid {name} endpoint {value}: {e}")))
}
