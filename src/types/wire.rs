//! Provider wire formats
//!
//! Field names are fixed by LinkedIn and X/Twitter and must match their JSON exactly.

use serde::{Deserialize, Serialize};

use super::Platform;

/// Response from an OAuth token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Issued access token
    pub access_token: String,
    /// Token type (usually "bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
    /// Granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Refresh token (Twitter with `offline.access`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Error response from a token endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

// ============================================================================
// LinkedIn
// ============================================================================

/// OpenID userinfo payload returned by LinkedIn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInUserInfo {
    /// Member subject id, used to build the author URN
    pub sub: String,
    /// Full display name
    #[serde(default)]
    pub name: Option<String>,
    /// Given name
    #[serde(default)]
    pub given_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub family_name: Option<String>,
    /// Primary email (requires the `email` scope)
    #[serde(default)]
    pub email: Option<String>,
    /// Whether LinkedIn verified the email
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Profile picture URL
    #[serde(default)]
    pub picture: Option<String>,
    /// Preferred locale
    #[serde(default)]
    pub locale: Option<LinkedInLocale>,
}

/// Locale block of the LinkedIn userinfo payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedInLocale {
    /// Country code
    pub country: String,
    /// Language code
    pub language: String,
}

/// Body returned by LinkedIn's UGC post endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LinkedInPostResponse {
    #[serde(default)]
    pub id: Option<String>,
}

// ============================================================================
// Twitter
// ============================================================================

/// Envelope returned by `/2/users/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUserResponse {
    /// The authenticated user
    pub data: TwitterUser,
}

/// Twitter user object with the requested `user.fields`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUser {
    /// Numeric user id as a string
    pub id: String,
    /// Display name
    pub name: String,
    /// Handle without the leading `@`
    pub username: String,
    /// Account creation timestamp (ISO 8601)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Profile bio
    #[serde(default)]
    pub description: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Follower and tweet counters
    #[serde(default)]
    pub public_metrics: Option<PublicMetrics>,
    /// Profile website
    #[serde(default)]
    pub url: Option<String>,
}

/// Public counters of a Twitter account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicMetrics {
    /// Followers
    pub followers_count: u64,
    /// Accounts followed
    pub following_count: u64,
    /// Posts authored
    pub tweet_count: u64,
    /// Lists containing the account
    pub listed_count: u64,
}

/// Envelope returned by `POST /2/tweets`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TweetResponse {
    pub data: TweetData,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TweetData {
    pub id: String,
    #[allow(dead_code)]
    pub text: String,
}

// ============================================================================
// Provider-neutral results
// ============================================================================

/// User identity resolved from a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Platform the profile was fetched from
    pub platform: Platform,
    /// Provider-side user id, used when posting
    pub user_id: String,
    /// Name shown to the user (LinkedIn display name, Twitter handle)
    pub username: String,
    /// Email address, when the provider shares it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account counters, when the provider shares them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PublicMetrics>,
}

impl From<LinkedInUserInfo> for Profile {
    fn from(info: LinkedInUserInfo) -> Self {
        let username = info
            .name
            .clone()
            .or_else(|| match (&info.given_name, &info.family_name) {
                (Some(g), Some(f)) => Some(format!("{g} {f}")),
                (Some(g), None) => Some(g.clone()),
                _ => None,
            })
            .unwrap_or_else(|| info.sub.clone());
        Self {
            platform: Platform::LinkedIn,
            user_id: info.sub,
            username,
            email: info.email,
            metrics: None,
        }
    }
}

impl From<TwitterUser> for Profile {
    fn from(user: TwitterUser) -> Self {
        Self {
            platform: Platform::Twitter,
            user_id: user.id,
            username: user.username,
            email: None,
            metrics: user.public_metrics,
        }
    }
}

/// Outcome of a successful post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostResult {
    /// Platform the content was posted to
    pub platform: Platform,
    /// Provider-assigned id of the new post, when returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkedin_token_response_minimal() {
        let json = r#"{"access_token":"tok1","expires_in":3600}"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "tok1");
        assert_eq!(resp.expires_in, 3600);
        assert!(resp.refresh_token.is_none());
    }

    #[test]
    fn test_twitter_token_response_full() {
        let json = r#"{
            "token_type": "bearer",
            "expires_in": 7200,
            "access_token": "tw-access",
            "scope": "tweet.write tweet.read users.read offline.access",
            "refresh_token": "tw-refresh"
        }"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token_type.as_deref(), Some("bearer"));
        assert_eq!(resp.refresh_token.as_deref(), Some("tw-refresh"));
    }

    #[test]
    fn test_token_response_requires_expires_in() {
        let json = r#"{"access_token":"tok1"}"#;
        assert!(serde_json::from_str::<TokenResponse>(json).is_err());
    }

    #[test]
    fn test_linkedin_userinfo_to_profile() {
        let json = r#"{
            "sub": "abc123",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "email": "ada@example.com",
            "email_verified": true,
            "picture": "https://example.com/p.png",
            "locale": {"country": "GB", "language": "en"}
        }"#;
        let info: LinkedInUserInfo = serde_json::from_str(json).unwrap();
        let profile = Profile::from(info);
        assert_eq!(profile.user_id, "abc123");
        assert_eq!(profile.username, "Ada Lovelace");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_linkedin_profile_name_fallbacks() {
        let info: LinkedInUserInfo =
            serde_json::from_str(r#"{"sub":"s1","given_name":"Grace"}"#).unwrap();
        assert_eq!(Profile::from(info).username, "Grace");

        let info: LinkedInUserInfo = serde_json::from_str(r#"{"sub":"s2"}"#).unwrap();
        assert_eq!(Profile::from(info).username, "s2");
    }

    #[test]
    fn test_twitter_user_to_profile() {
        let json = r#"{"data":{
            "id": "42",
            "name": "Jack",
            "username": "jack",
            "public_metrics": {"followers_count": 10, "following_count": 2, "tweet_count": 5, "listed_count": 0}
        }}"#;
        let resp: TwitterUserResponse = serde_json::from_str(json).unwrap();
        let profile = Profile::from(resp.data);
        assert_eq!(profile.platform, Platform::Twitter);
        assert_eq!(profile.user_id, "42");
        assert_eq!(profile.username, "jack");
        assert_eq!(profile.metrics.map(|m| m.followers_count), Some(10));
    }
}
