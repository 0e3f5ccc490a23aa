//! Client configuration
//!
//! Provider client credentials are sourced once at startup from a
//! [`CredentialSource`] and passed explicitly into each provider adapter.
//! Keeping them in an external document lets them be rotated without
//! rebuilding the client.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

use crate::error::{LinkupError, Result};
use crate::providers::{LinkedInEndpoints, TwitterEndpoints};
use crate::types::Platform;

/// Default timeout for every HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth client registration for one platform
///
/// Field names match the remote credentials document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret (unused by public PKCE clients)
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI registered with the provider
    pub redirect_url: String,
    /// Custom scheme of `redirect_url`, intercepted by the consent surface
    pub callback_url_scheme: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("callback_url_scheme", &self.callback_url_scheme)
            .finish()
    }
}

impl ProviderCredentials {
    /// Create credentials
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
        callback_url_scheme: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            callback_url_scheme: callback_url_scheme.into(),
        }
    }

    /// Check that every field the platform needs is present
    ///
    /// # Errors
    ///
    /// Returns `Configuration` naming the first missing or malformed field.
    pub fn validate(&self, platform: Platform, require_secret: bool) -> Result<()> {
        let missing = |field: &str| {
            LinkupError::configuration(format!("{platform} credentials are missing {field}"))
        };
        if self.client_id.trim().is_empty() {
            return Err(missing("client_id"));
        }
        if require_secret && self.client_secret.trim().is_empty() {
            return Err(missing("client_secret"));
        }
        if self.redirect_url.trim().is_empty() {
            return Err(missing("redirect_url"));
        }
        if self.callback_url_scheme.trim().is_empty() {
            return Err(missing("callback_url_scheme"));
        }
        Url::parse(&self.redirect_url).map_err(|e| {
            LinkupError::configuration(format!("{platform} redirect_url is invalid: {e}"))
        })?;
        Ok(())
    }
}

/// Supplies provider credentials per platform
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the credentials document for `platform`
    async fn fetch(&self, platform: Platform) -> Result<ProviderCredentials>;
}

// ============================================================================
// Static source
// ============================================================================

/// Credentials fixed at construction time
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    entries: HashMap<Platform, ProviderCredentials>,
}

impl StaticCredentialSource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add credentials for a platform
    #[must_use]
    pub fn with(mut self, platform: Platform, credentials: ProviderCredentials) -> Self {
        self.entries.insert(platform, credentials);
        self
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn fetch(&self, platform: Platform) -> Result<ProviderCredentials> {
        self.entries.get(&platform).cloned().ok_or_else(|| {
            LinkupError::configuration(format!("no credentials configured for {platform}"))
        })
    }
}

// ============================================================================
// File source
// ============================================================================

/// JSON document keyed by platform, re-read on every fetch
///
/// ```json
/// {
///   "linkedin": { "client_id": "...", "client_secret": "...", "redirect_url": "...", "callback_url_scheme": "..." },
///   "twitter":  { "client_id": "...", "redirect_url": "...", "callback_url_scheme": "..." }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl Default for FileCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FileCredentialSource {
    /// Source at the default path (platform-specific config directory)
    #[must_use]
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("social-linkup");
        Self::with_path(config_dir.join("credentials.json"))
    }

    /// Source at a custom path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the document path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn fetch(&self, platform: Platform) -> Result<ProviderCredentials> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LinkupError::configuration(format!(
                    "credentials file not found: {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut document: HashMap<String, ProviderCredentials> = serde_json::from_str(&content)
            .map_err(|e| {
                LinkupError::configuration(format!(
                    "credentials file {} is malformed: {e}",
                    self.path.display()
                ))
            })?;

        document.remove(platform.key()).ok_or_else(|| {
            LinkupError::configuration(format!(
                "credentials file has no entry for {}",
                platform.key()
            ))
        })
    }
}

// ============================================================================
// Remote source
// ============================================================================

/// Fetches `{base_url}/{platform}` from a remote keyed document store
#[derive(Debug, Clone)]
pub struct RemoteCredentialSource {
    base_url: Url,
    http_client: reqwest::Client,
    bearer_token: Option<String>,
}

impl RemoteCredentialSource {
    /// Create a source rooted at `base_url`
    #[must_use]
    pub fn new(base_url: Url, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            http_client,
            bearer_token: None,
        }
    }

    /// Authenticate document requests with a bearer token
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn document_url(&self, platform: Platform) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{}", platform.key()))
            .map_err(|e| LinkupError::configuration(format!("invalid credentials URL: {e}")))
    }
}

#[async_trait]
impl CredentialSource for RemoteCredentialSource {
    async fn fetch(&self, platform: Platform) -> Result<ProviderCredentials> {
        let url = self.document_url(platform)?;
        tracing::debug!(%platform, "Fetching provider credentials document");

        let mut request = self.http_client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkupError::configuration(format!(
                "credentials document for {} unavailable (status {})",
                platform.key(),
                status.as_u16()
            )));
        }

        response.json::<ProviderCredentials>().await.map_err(|e| {
            LinkupError::configuration(format!(
                "credentials document for {} is malformed: {e}",
                platform.key()
            ))
        })
    }
}

// ============================================================================
// Client configuration
// ============================================================================

/// Client-wide settings
#[derive(Debug, Clone, TypedBuilder)]
pub struct LinkupConfig {
    /// Timeout applied to every HTTP request
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,

    /// `User-Agent` header sent to providers
    #[builder(default = format!("social-linkup/{}", crate::VERSION), setter(into))]
    pub user_agent: String,

    /// LinkedIn endpoint URLs
    #[builder(default)]
    pub linkedin: LinkedInEndpoints,

    /// Twitter endpoint URLs
    #[builder(default)]
    pub twitter: TwitterEndpoints,
}

impl Default for LinkupConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LinkupConfig {
    /// Build the shared HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn linkedin_credentials() -> ProviderCredentials {
        ProviderCredentials::new("id", "secret", "linkup://auth/callback", "linkup")
    }

    #[test]
    fn test_validate_accepts_complete_credentials() {
        linkedin_credentials()
            .validate(Platform::LinkedIn, true)
            .unwrap();
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut creds = linkedin_credentials();
        creds.client_secret.clear();
        assert!(creds.validate(Platform::LinkedIn, true).is_err());
        creds.validate(Platform::Twitter, false).unwrap();

        creds.redirect_url = "not a url".to_string();
        let err = creds.validate(Platform::Twitter, false).unwrap_err();
        assert!(matches!(err, LinkupError::Configuration(msg) if msg.contains("redirect_url")));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let printed = format!("{:?}", linkedin_credentials());
        assert!(!printed.contains("secret\""));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticCredentialSource::new().with(Platform::LinkedIn, linkedin_credentials());
        assert_eq!(
            source.fetch(Platform::LinkedIn).await.unwrap(),
            linkedin_credentials()
        );
        assert!(matches!(
            source.fetch(Platform::Twitter).await,
            Err(LinkupError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_file_source_reads_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"twitter": {"client_id": "tw", "redirect_url": "linkup://cb", "callback_url_scheme": "linkup"}}"#,
        )
        .unwrap();

        let source = FileCredentialSource::with_path(path);
        let creds = source.fetch(Platform::Twitter).await.unwrap();
        assert_eq!(creds.client_id, "tw");
        assert!(creds.client_secret.is_empty());
        assert!(matches!(
            source.fetch(Platform::LinkedIn).await,
            Err(LinkupError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = FileCredentialSource::with_path(temp_dir.path().join("absent.json"));
        assert!(matches!(
            source.fetch(Platform::Twitter).await,
            Err(LinkupError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = LinkupConfig::default();
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.user_agent.starts_with("social-linkup/"));
        assert_eq!(
            config.twitter.authorize.as_str(),
            "https://twitter.com/i/oauth2/authorize"
        );
    }

    #[test]
    fn test_remote_document_url() {
        let source = RemoteCredentialSource::new(
            Url::parse("https://config.example.com/OAuthCredentials/").unwrap(),
            reqwest::Client::new(),
        );
        assert_eq!(
            source.document_url(Platform::LinkedIn).unwrap().as_str(),
            "https://config.example.com/OAuthCredentials/linkedin"
        );
    }
}
