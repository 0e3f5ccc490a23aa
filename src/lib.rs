//! # Social Linkup
//!
//! OAuth client for posting to LinkedIn and X/Twitter from one place.
//! Async/await, strong typing, tokio-based.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use social_linkup::auth::{ChannelConsent, CredentialVault, FileStore, open_in_browser};
//! use social_linkup::config::{FileCredentialSource, LinkupConfig};
//! use social_linkup::{Platform, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (consent, callbacks) = ChannelConsent::new(open_in_browser);
//!     let session = Session::from_source(
//!         &FileCredentialSource::new(),
//!         &LinkupConfig::default(),
//!         CredentialVault::new(Arc::new(FileStore::new())),
//!         Arc::new(consent),
//!     )
//!     .await?;
//!     session.restore()?;
//!
//!     // The host's URL handler feeds intercepted redirects back in:
//!     // callbacks.deliver_str("linkup://auth/callback?code=...&state=...")?;
//!     # drop(callbacks);
//!     session.login(Platform::LinkedIn).await?;
//!
//!     let report = session.post_to_all("Hello, world!").await?;
//!     for (platform, error) in report.failed() {
//!         eprintln!("{platform}: {error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`session`]: Unified login / logout / post-to-all over every platform
//! - [`providers`]: LinkedIn and Twitter adapters behind [`ProviderAdapter`]
//! - [`auth`]: OAuth flow engine, PKCE, consent surfaces and credential stores
//! - [`config`]: Provider client credentials and client-wide settings
//! - [`types`]: Platforms, credentials and provider wire formats
//! - [`error`]: Error types and handling
//!
//! ## Feature Flags
//!
//! - `keyring` - Enables [`auth::KeyringStore`], backed by the OS secret store
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tokens, codes and client secrets are never logged. To see logs, attach a
//! subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, LinkupError>`](Result):
//!
//! ```no_run
//! # use social_linkup::{LinkupError, Platform, Session};
//! # async fn example(session: &Session) {
//! match session.login(Platform::Twitter).await {
//!     Ok(credential) => println!("Logged in as {:?}", credential.username),
//!     Err(LinkupError::ConsentCancelled) => {}
//!     Err(LinkupError::StateMismatch { .. }) => eprintln!("Login rejected, try again"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # }
//! ```
//!
//! ## Security
//!
//! - **State tokens** - 256 bits from the OS random source, accepted at most once
//! - **PKCE** - S256 challenge for public clients (Twitter)
//! - **Credential storage** - File store is written with mode 600; keyring store available
//! - **No ambient secrets** - Client credentials are passed explicitly into each adapter

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod providers;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use auth::{
    AuthConfig, CallbackHandle, ChannelConsent, ConsentOutcome, ConsentSurface, CredentialStore,
    CredentialVault, FileStore, FlowState, MemoryStore, OAuthFlowEngine,
};
pub use config::{
    CredentialSource, FileCredentialSource, LinkupConfig, ProviderCredentials,
    RemoteCredentialSource, StaticCredentialSource,
};
pub use error::{LinkupError, Result};
pub use providers::{LinkedInAdapter, ProviderAdapter, TwitterAdapter};
pub use session::{AccountStatus, PostReport, Session, SessionStatus};
pub use types::{Credential, Platform, PostResult, Profile, TokenResponse};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
