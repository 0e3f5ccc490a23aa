//! X/Twitter adapter (OAuth 2.0 public client with PKCE, API v2)

use async_trait::async_trait;
use serde_json::json;

use super::{ProviderAdapter, check_response, join_url, parse_endpoint, require_text, require_token};
use crate::auth::AuthConfig;
use crate::config::ProviderCredentials;
use crate::error::Result;
use crate::types::wire::TweetResponse;
use crate::types::{Credential, Platform, PostResult, Profile, TwitterUserResponse};

const DEFAULT_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
const DEFAULT_API_BASE: &str = "https://api.x.com";
const SCOPES: [&str; 4] = ["tweet.write", "tweet.read", "users.read", "offline.access"];
const USER_FIELDS: &str = "created_at,description,profile_image_url,public_metrics,username,url";

/// Twitter endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterEndpoints {
    /// Authorization page
    pub authorize: String,
    /// Token exchange
    pub token: String,
    /// Authenticated user lookup
    pub users_me: String,
    /// Post creation
    pub tweets: String,
}

impl Default for TwitterEndpoints {
    fn default() -> Self {
        Self {
            authorize: DEFAULT_AUTHORIZE_URL.to_string(),
            ..Self::with_base(DEFAULT_API_BASE)
        }
    }
}

impl TwitterEndpoints {
    /// Point every endpoint at one host, keeping Twitter's paths
    pub fn with_base(base: &str) -> Self {
        Self {
            authorize: join_url(base, "/i/oauth2/authorize"),
            token: join_url(base, "/2/oauth2/token"),
            users_me: join_url(base, "/2/users/me"),
            tweets: join_url(base, "/2/tweets"),
        }
    }
}

/// Twitter provider adapter
#[derive(Debug, Clone)]
pub struct TwitterAdapter {
    credentials: ProviderCredentials,
    endpoints: TwitterEndpoints,
    http_client: reqwest::Client,
}

impl TwitterAdapter {
    /// Create an adapter with explicit credentials and endpoints
    #[must_use]
    pub fn new(
        credentials: ProviderCredentials,
        endpoints: TwitterEndpoints,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            http_client,
        }
    }
}

#[async_trait]
impl ProviderAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn build_auth_config(&self) -> Result<AuthConfig> {
        self.credentials.validate(Platform::Twitter, false)?;
        // Public client: the PKCE verifier replaces the client secret.
        Ok(AuthConfig::builder()
            .platform(Platform::Twitter)
            .authorize_url(parse_endpoint("authorization", &self.endpoints.authorize)?)
            .token_url(parse_endpoint("token", &self.endpoints.token)?)
            .client_id(self.credentials.client_id.clone())
            .redirect_uri(self.credentials.redirect_url.clone())
            .callback_scheme(self.credentials.callback_url_scheme.clone())
            .scopes(SCOPES.iter().map(|s| (*s).to_string()).collect())
            .pkce_required(true)
            .build())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        require_token(Platform::Twitter, access_token)?;

        let response = self
            .http_client
            .get(&self.endpoints.users_me)
            .query(&[("user.fields", USER_FIELDS)])
            .bearer_auth(access_token)
            .send()
            .await?;
        let user: TwitterUserResponse = check_response(response).await?.json()?;

        tracing::debug!(username = %user.data.username, "Fetched Twitter profile");
        Ok(Profile::from(user.data))
    }

    async fn post_content(&self, credential: &Credential, text: &str) -> Result<PostResult> {
        require_token(Platform::Twitter, &credential.access_token)?;
        require_text(text)?;

        let response = self
            .http_client
            .post(&self.endpoints.tweets)
            .bearer_auth(&credential.access_token)
            .json(&json!({ "text": text }))
            .send()
            .await?;
        let tweet: TweetResponse = check_response(response).await?.json()?;

        tracing::info!(post_id = %tweet.data.id, "Posted to Twitter");
        Ok(PostResult {
            platform: Platform::Twitter,
            post_id: Some(tweet.data.id),
        })
    }
}
