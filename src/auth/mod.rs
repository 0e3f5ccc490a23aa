//! OAuth authentication module
//!
//! Provides the OAuth 2.0 authorization-code flow (with PKCE where the provider
//! requires it) plus local credential storage.
//!
//! # Overview
//!
//! 1. [`OAuthFlowEngine::begin_flow`] issues a fresh state token (and PKCE pair)
//!    and builds the authorization URL
//! 2. A [`ConsentSurface`] shows the URL and returns the redirect to the
//!    app's callback scheme
//! 3. The engine checks the callback's state against the pending request
//! 4. The code is exchanged for a [`TokenResponse`](crate::types::TokenResponse)
//! 5. A [`CredentialVault`] persists the resulting credential
//!
//! # Example
//!
//! ```no_run
//! use social_linkup::auth::{AuthConfig, OAuthFlowEngine};
//! use social_linkup::types::Platform;
//! use url::Url;
//!
//! # async fn example() -> social_linkup::Result<()> {
//! let config = AuthConfig::builder()
//!     .platform(Platform::Twitter)
//!     .authorize_url(Url::parse("https://twitter.com/i/oauth2/authorize").unwrap())
//!     .token_url(Url::parse("https://api.x.com/2/oauth2/token").unwrap())
//!     .client_id("my-client-id")
//!     .redirect_uri("linkup://auth/callback")
//!     .callback_scheme("linkup")
//!     .scopes(vec!["tweet.write".into(), "users.read".into()])
//!     .pkce_required(true)
//!     .build();
//!
//! let engine = OAuthFlowEngine::default();
//! let pending = engine.begin_flow(&config)?;
//! println!("Open: {}", pending.url);
//!
//! // ... later, when the app intercepts linkup://auth/callback?code=..&state=..
//! # let callback = Url::parse("linkup://auth/callback?code=x&state=y").unwrap();
//! let token = engine.complete(&callback).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - State tokens and PKCE verifiers come from the OS random source
//! - A state token is accepted at most once
//! - File-backed credentials are stored with user-only permissions (600)

mod consent;
mod flow;
pub mod pkce;
mod store;

pub use consent::{
    CallbackHandle, ChannelConsent, ConsentOutcome, ConsentSurface, DEFAULT_CONSENT_TIMEOUT,
    open_in_browser,
};
pub use flow::{
    AuthConfig, AuthorizationRequest, FlowState, OAuthFlowEngine, PendingAuthorization,
    ValidatedCallback, generate_state,
};
pub use pkce::{PkcePair, derive_challenge, generate_verifier};
#[cfg(feature = "keyring")]
pub use store::KeyringStore;
pub use store::{CredentialStore, CredentialVault, FileStore, MemoryStore, StoreError};
#[cfg(test)]
pub(crate) use store::testing;
