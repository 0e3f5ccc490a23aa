//! Platform identifier

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LinkupError;

/// A social platform supported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// LinkedIn (OAuth 2.0 with client secret)
    LinkedIn,
    /// X / Twitter (OAuth 2.0 with PKCE)
    Twitter,
}

impl Platform {
    /// All supported platforms, in display order
    pub const ALL: [Platform; 2] = [Platform::LinkedIn, Platform::Twitter];

    /// Key used for this platform in credential stores and remote config documents
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Twitter => "twitter",
        }
    }

    /// Human-readable platform name
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "Twitter",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = LinkupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linkedin" => Ok(Platform::LinkedIn),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(LinkupError::invalid_input(format!(
                "unknown platform: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_keys() {
        assert_eq!(Platform::LinkedIn.key(), "linkedin");
        assert_eq!(Platform::Twitter.key(), "twitter");
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("LinkedIn".parse::<Platform>().unwrap(), Platform::LinkedIn);
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::Twitter);
        assert!("mastodon".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_matches_key() {
        let json = serde_json::to_string(&Platform::Twitter).unwrap();
        assert_eq!(json, "\"twitter\"");
    }
}
