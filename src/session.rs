//! Session aggregator
//!
//! A [`Session`] composes one [`ProviderAdapter`] per platform and offers a
//! unified login / logout / post-to-all surface. Every platform has its own
//! [`OAuthFlowEngine`], so logins on different platforms run independently.
//!
//! The combined state is published as a [`SessionStatus`] on a
//! `tokio::sync::watch` channel. A presentation layer subscribes to it and
//! never has to inspect errors: failures land in `last_error` and the loading
//! flag is cleared once the operation has actually settled.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use social_linkup::auth::{ChannelConsent, CredentialVault, FileStore, open_in_browser};
//! use social_linkup::config::{FileCredentialSource, LinkupConfig};
//! use social_linkup::{Platform, Session};
//!
//! # async fn example() -> social_linkup::Result<()> {
//! let (consent, _callbacks) = ChannelConsent::new(open_in_browser);
//! let vault = CredentialVault::new(Arc::new(FileStore::new()));
//!
//! let session = Session::from_source(
//!     &FileCredentialSource::new(),
//!     &LinkupConfig::default(),
//!     vault,
//!     Arc::new(consent),
//! )
//! .await?;
//! session.restore()?;
//!
//! if !session.is_logged_in(Platform::Twitter) {
//!     session.login(Platform::Twitter).await?;
//! }
//! let report = session.post_to_all("Hello from social-linkup").await?;
//! println!("{} posts published", report.succeeded().count());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tokio::sync::watch;

use crate::auth::{ConsentOutcome, ConsentSurface, CredentialVault, OAuthFlowEngine};
use crate::config::{CredentialSource, LinkupConfig};
use crate::error::{LinkupError, Result};
use crate::providers::{LinkedInAdapter, ProviderAdapter, TwitterAdapter, require_text};
use crate::types::{Credential, Platform, PostResult};

/// Loading message shown while posts are in flight
pub const POSTING_MESSAGE: &str = "Posting message...";

/// Per-account login state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStatus {
    /// Whether a usable credential is held
    pub logged_in: bool,
    /// Display name of the logged-in user, once known
    pub username: Option<String>,
}

/// Snapshot of the session for a presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    /// Login state of every registered platform
    pub accounts: BTreeMap<Platform, AccountStatus>,
    /// Whether a login or post is in progress
    pub loading: bool,
    /// Message describing the operation in progress
    pub loading_message: Option<String>,
    /// Message of the most recent failure
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Whether `platform` is logged in
    #[must_use]
    pub fn is_logged_in(&self, platform: Platform) -> bool {
        self.accounts
            .get(&platform)
            .is_some_and(|account| account.logged_in)
    }
}

/// Per-platform outcome of [`Session::post_to_all`]
#[derive(Debug, Default)]
pub struct PostReport {
    results: BTreeMap<Platform, Result<PostResult>>,
}

impl PostReport {
    /// Outcome for one platform, if a post was dispatched to it
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&Result<PostResult>> {
        self.results.get(&platform)
    }

    /// Platforms a post was dispatched to
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.results.keys().copied()
    }

    /// Successful posts
    pub fn succeeded(&self) -> impl Iterator<Item = &PostResult> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    /// Failed posts with their errors
    pub fn failed(&self) -> impl Iterator<Item = (Platform, &LinkupError)> {
        self.results
            .iter()
            .filter_map(|(p, r)| r.as_ref().err().map(|e| (*p, e)))
    }

    /// Whether no platform was authenticated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether every dispatched post succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    /// Consume the report
    #[must_use]
    pub fn into_results(self) -> BTreeMap<Platform, Result<PostResult>> {
        self.results
    }
}

struct ProviderSlot {
    adapter: Arc<dyn ProviderAdapter>,
    engine: OAuthFlowEngine,
}

/// Unified multi-platform session
pub struct Session {
    providers: BTreeMap<Platform, ProviderSlot>,
    vault: CredentialVault,
    consent: Arc<dyn ConsentSurface>,
    http_client: reqwest::Client,
    credentials: RwLock<HashMap<Platform, Credential>>,
    in_flight: AtomicUsize,
    status: watch::Sender<SessionStatus>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("platforms", &self.platforms())
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with no providers registered
    ///
    /// Flow engines added through [`Session::with_adapter`] exchange codes
    /// with `http_client`.
    pub fn new(
        vault: CredentialVault,
        consent: Arc<dyn ConsentSurface>,
        http_client: reqwest::Client,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        Self {
            providers: BTreeMap::new(),
            vault,
            consent,
            http_client,
            credentials: RwLock::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            status,
        }
    }

    /// Register an adapter, replacing any previous one for its platform
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        let platform = adapter.platform();
        self.providers.insert(
            platform,
            ProviderSlot {
                adapter,
                engine: OAuthFlowEngine::new(self.http_client.clone()),
            },
        );
        self.status.send_modify(|status| {
            status.accounts.entry(platform).or_default();
        });
        self
    }

    /// Build a session for every platform `source` has credentials for
    ///
    /// Credentials are fetched once here and handed to the adapters. A
    /// platform whose credentials cannot be fetched is left unregistered.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if no platform could be configured, or an
    /// HTTP error if the client cannot be built.
    pub async fn from_source(
        source: &dyn CredentialSource,
        config: &LinkupConfig,
        vault: CredentialVault,
        consent: Arc<dyn ConsentSurface>,
    ) -> Result<Self> {
        let http_client = config.http_client()?;
        let mut session = Self::new(vault, consent, http_client.clone());

        for platform in Platform::ALL {
            let credentials = match source.fetch(platform).await {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::warn!(%platform, "Provider credentials unavailable: {e}");
                    continue;
                }
            };
            let adapter: Arc<dyn ProviderAdapter> = match platform {
                Platform::LinkedIn => Arc::new(LinkedInAdapter::new(
                    credentials,
                    config.linkedin.clone(),
                    http_client.clone(),
                )),
                Platform::Twitter => Arc::new(TwitterAdapter::new(
                    credentials,
                    config.twitter.clone(),
                    http_client.clone(),
                )),
            };
            session = session.with_adapter(adapter);
        }

        if session.providers.is_empty() {
            return Err(LinkupError::configuration(
                "no provider credentials could be loaded",
            ));
        }
        Ok(session)
    }

    /// Registered platforms
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.providers.keys().copied().collect()
    }

    /// Subscribe to status updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Load persisted credentials for every registered platform
    ///
    /// Expired credentials are left in the store but not treated as logged in.
    /// Returns the platforms that were restored.
    pub fn restore(&self) -> Result<Vec<Platform>> {
        let mut restored = Vec::new();
        for platform in self.platforms() {
            match self.vault.load(platform)? {
                Some(credential) if credential.is_usable() => {
                    tracing::debug!(%platform, "Restored stored credential");
                    self.set_credential(credential);
                    restored.push(platform);
                }
                Some(_) => tracing::debug!(%platform, "Stored credential has expired"),
                None => {}
            }
        }
        Ok(restored)
    }

    /// Whether `platform` holds a live, unexpired credential
    #[must_use]
    pub fn is_logged_in(&self, platform: Platform) -> bool {
        self.read_credentials()
            .get(&platform)
            .is_some_and(Credential::is_usable)
    }

    /// The credential held for `platform`
    #[must_use]
    pub fn credential(&self, platform: Platform) -> Option<Credential> {
        self.read_credentials().get(&platform).cloned()
    }

    /// Run the full authorization flow for `platform`
    ///
    /// On success the credential is persisted and the account is marked
    /// logged in. On failure the login state is left unchanged.
    ///
    /// # Errors
    ///
    /// `Configuration` for an unregistered or misconfigured platform,
    /// `ConsentCancelled` if the user closed the consent surface, and the
    /// flow errors of [`OAuthFlowEngine`].
    pub async fn login(&self, platform: Platform) -> Result<Credential> {
        let _loading = self.start_loading(format!("Logging into {}...", platform.display_name()));
        let result = self.run_login(platform).await;

        match &result {
            Ok(credential) => {
                tracing::info!(%platform, "Logged in");
                self.status.send_modify(|status| {
                    status.last_error = None;
                    status.accounts.insert(
                        platform,
                        AccountStatus {
                            logged_in: true,
                            username: credential.username.clone(),
                        },
                    );
                });
            }
            Err(e) if e.is_flow_error() => {
                tracing::info!(%platform, "Login not completed: {e}");
                self.record_error(e);
            }
            Err(e) => {
                tracing::warn!(%platform, "Login failed: {e}");
                self.record_error(e);
            }
        }
        result
    }

    async fn run_login(&self, platform: Platform) -> Result<Credential> {
        let slot = self.slot(platform)?;
        let config = slot.adapter.build_auth_config()?;
        let pending = slot.engine.begin_flow(&config)?;

        let outcome = match self
            .consent
            .present(&pending.url, &pending.callback_scheme)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                slot.engine.abandon(&pending.state);
                return Err(e);
            }
        };
        let callback = match outcome {
            ConsentOutcome::Callback(url) => url,
            ConsentOutcome::Cancelled => {
                slot.engine.abandon(&pending.state);
                tracing::info!(%platform, "Consent cancelled by user");
                return Err(LinkupError::ConsentCancelled);
            }
        };

        let token = slot.engine.complete(&callback).await?;
        let mut credential = Credential::from_token_response(platform, token);
        self.vault.save(&credential)?;

        // The token is already valid; a failed profile lookup only leaves the username unknown.
        match slot.adapter.fetch_profile(&credential.access_token).await {
            Ok(profile) => {
                credential.username = Some(profile.username);
                credential.user_id = Some(profile.user_id);
                if let Err(e) = self.vault.save(&credential) {
                    tracing::warn!(%platform, "Could not persist profile details: {e}");
                }
            }
            Err(e) => tracing::warn!(%platform, "Profile fetch after login failed: {e}"),
        }

        self.write_credentials().insert(platform, credential.clone());
        Ok(credential)
    }

    /// Forget the credential for `platform`
    ///
    /// Logging out of a platform that is not logged in is a no-op.
    ///
    /// # Errors
    ///
    /// `Storage` if the stored credential could not be removed. The platform
    /// then stays logged in.
    pub fn logout(&self, platform: Platform) -> Result<()> {
        // Stay logged in unless the persisted credential is really gone.
        if let Err(e) = self.vault.delete(platform) {
            tracing::warn!(%platform, "Logout failed: {e}");
            self.record_error(&e);
            return Err(e.into());
        }
        let removed = self.write_credentials().remove(&platform).is_some();
        if let Some(slot) = self.providers.get(&platform) {
            slot.engine.reset();
        }

        if removed {
            tracing::info!(%platform, "Logged out");
        }
        self.status.send_modify(|status| {
            if let Some(account) = status.accounts.get_mut(&platform) {
                *account = AccountStatus::default();
            }
        });
        Ok(())
    }

    /// Post `text` to every logged-in platform
    ///
    /// Posts are dispatched concurrently and the call returns once every one
    /// has settled. A failure on one platform does not affect the others.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `text` is blank. Per-platform failures are reported
    /// in the returned [`PostReport`].
    pub async fn post_to_all(&self, text: &str) -> Result<PostReport> {
        require_text(text)?;

        let targets: Vec<(Arc<dyn ProviderAdapter>, Credential)> = {
            let credentials = self.read_credentials();
            self.providers
                .iter()
                .filter_map(|(platform, slot)| {
                    credentials
                        .get(platform)
                        .filter(|c| c.is_usable())
                        .map(|c| (Arc::clone(&slot.adapter), c.clone()))
                })
                .collect()
        };

        if targets.is_empty() {
            tracing::info!("No authenticated platforms to post to");
            return Ok(PostReport::default());
        }

        let _loading = self.start_loading(POSTING_MESSAGE.to_string());
        let outcomes = join_all(targets.iter().map(|(adapter, credential)| async move {
            (adapter.platform(), adapter.post_content(credential, text).await)
        }))
        .await;

        let report = PostReport {
            results: outcomes.into_iter().collect(),
        };
        for (platform, e) in report.failed() {
            tracing::warn!(%platform, "Post failed: {e}");
        }
        match report.failed().next() {
            Some((platform, e)) => self.record_error(&format!("{platform}: {e}")),
            None => self.status.send_modify(|status| status.last_error = None),
        }
        Ok(report)
    }

    fn slot(&self, platform: Platform) -> Result<&ProviderSlot> {
        self.providers.get(&platform).ok_or_else(|| {
            LinkupError::configuration(format!("no provider registered for {platform}"))
        })
    }

    fn set_credential(&self, credential: Credential) {
        let platform = credential.platform;
        let username = credential.username.clone();
        self.write_credentials().insert(platform, credential);
        self.status.send_modify(|status| {
            status.accounts.insert(
                platform,
                AccountStatus {
                    logged_in: true,
                    username,
                },
            );
        });
    }

    fn record_error(&self, error: &dyn std::fmt::Display) {
        let message = error.to_string();
        self.status
            .send_modify(|status| status.last_error = Some(message));
    }

    fn start_loading(&self, message: String) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.status.send_modify(|status| {
            status.loading = true;
            status.loading_message = Some(message);
        });
        LoadingGuard { session: self }
    }

    fn read_credentials(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Platform, Credential>> {
        self.credentials.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_credentials(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Platform, Credential>> {
        self.credentials.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the loading flag when the last in-flight operation settles
struct LoadingGuard<'a> {
    session: &'a Session,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.session.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.session.status.send_modify(|status| {
                status.loading = false;
                status.loading_message = None;
            });
        }
    }
}
