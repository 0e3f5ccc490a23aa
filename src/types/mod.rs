//! Type definitions for Social Linkup
//!
//! Platform identifiers, the persisted [`Credential`], and the provider wire
//! formats decoded from LinkedIn and X/Twitter responses.

pub mod credential;
pub mod platform;
pub mod wire;

pub use credential::Credential;
pub use platform::Platform;
pub use wire::{
    LinkedInLocale, LinkedInUserInfo, PostResult, Profile, PublicMetrics, TokenResponse,
    TwitterUser, TwitterUserResponse,
};
