//! LinkedIn adapter (OAuth 2.0 with client secret, OpenID userinfo, UGC posts)

use async_trait::async_trait;
use serde_json::json;

use super::{ProviderAdapter, check_response, join_url, parse_endpoint, require_text, require_token};
use crate::auth::AuthConfig;
use crate::config::ProviderCredentials;
use crate::error::Result;
use crate::types::wire::LinkedInPostResponse;
use crate::types::{Credential, LinkedInUserInfo, Platform, PostResult, Profile};

const DEFAULT_AUTHORIZE_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const DEFAULT_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const DEFAULT_API_BASE: &str = "https://api.linkedin.com";
const SCOPES: [&str; 4] = ["openid", "profile", "w_member_social", "email"];
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

/// LinkedIn endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedInEndpoints {
    /// Authorization page
    pub authorize: String,
    /// Token exchange
    pub token: String,
    /// OpenID userinfo
    pub userinfo: String,
    /// UGC post creation
    pub ugc_posts: String,
}

impl Default for LinkedInEndpoints {
    fn default() -> Self {
        Self {
            authorize: DEFAULT_AUTHORIZE_URL.to_string(),
            token: DEFAULT_TOKEN_URL.to_string(),
            userinfo: join_url(DEFAULT_API_BASE, "/v2/userinfo"),
            ugc_posts: join_url(DEFAULT_API_BASE, "/v2/ugcPosts"),
        }
    }
}

impl LinkedInEndpoints {
    /// Point every endpoint at one host, keeping LinkedIn's paths
    pub fn with_base(base: &str) -> Self {
        Self {
            authorize: join_url(base, "/oauth/v2/authorization"),
            token: join_url(base, "/oauth/v2/accessToken"),
            userinfo: join_url(base, "/v2/userinfo"),
            ugc_posts: join_url(base, "/v2/ugcPosts"),
        }
    }
}

/// LinkedIn provider adapter
#[derive(Debug, Clone)]
pub struct LinkedInAdapter {
    credentials: ProviderCredentials,
    endpoints: LinkedInEndpoints,
    http_client: reqwest::Client,
}

impl LinkedInAdapter {
    /// Create an adapter with explicit credentials and endpoints
    #[must_use]
    pub fn new(
        credentials: ProviderCredentials,
        endpoints: LinkedInEndpoints,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            endpoints,
            http_client,
        }
    }

    /// Author URN for a member subject id
    #[must_use]
    pub fn author_urn(subject: &str) -> String {
        format!("urn:li:person:{subject}")
    }

    fn ugc_body(author: &str, text: &str) -> serde_json::Value {
        json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        })
    }
}

#[async_trait]
impl ProviderAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn build_auth_config(&self) -> Result<AuthConfig> {
        self.credentials.validate(Platform::LinkedIn, true)?;
        Ok(AuthConfig::builder()
            .platform(Platform::LinkedIn)
            .authorize_url(parse_endpoint("authorization", &self.endpoints.authorize)?)
            .token_url(parse_endpoint("token", &self.endpoints.token)?)
            .client_id(self.credentials.client_id.clone())
            .client_secret(self.credentials.client_secret.clone())
            .redirect_uri(self.credentials.redirect_url.clone())
            .callback_scheme(self.credentials.callback_url_scheme.clone())
            .scopes(SCOPES.iter().map(|s| (*s).to_string()).collect())
            .pkce_required(false)
            .build())
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        require_token(Platform::LinkedIn, access_token)?;

        let response = self
            .http_client
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await?;
        let info: LinkedInUserInfo = check_response(response).await?.json()?;

        tracing::debug!("Fetched LinkedIn profile");
        Ok(Profile::from(info))
    }

    async fn post_content(&self, credential: &Credential, text: &str) -> Result<PostResult> {
        require_token(Platform::LinkedIn, &credential.access_token)?;
        require_text(text)?;

        let subject = match credential.user_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.fetch_profile(&credential.access_token).await?.user_id,
        };

        let response = self
            .http_client
            .post(&self.endpoints.ugc_posts)
            .bearer_auth(&credential.access_token)
            .header("X-Restli-Protocol-Version", RESTLI_PROTOCOL_VERSION)
            .json(&Self::ugc_body(&Self::author_urn(&subject), text))
            .send()
            .await?;
        let checked = check_response(response).await?;

        let post_id = checked
            .headers
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| {
                serde_json::from_str::<LinkedInPostResponse>(&checked.body)
                    .ok()
                    .and_then(|r| r.id)
            });

        tracing::info!(post_id = ?post_id, "Posted to LinkedIn");
        Ok(PostResult {
            platform: Platform::LinkedIn,
            post_id,
        })
    }
}
