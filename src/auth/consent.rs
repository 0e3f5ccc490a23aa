//! User consent surfaces
//!
//! A [`ConsentSurface`] shows the provider's authorization page and hands back
//! the redirect to the app's custom callback scheme. [`ChannelConsent`] is the
//! in-process implementation: the host opens the URL however it likes and feeds
//! intercepted callback URLs through a [`CallbackHandle`], which routes each one
//! to the waiting login attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use url::Url;

use crate::error::{LinkupError, Result};

/// Default time to wait for the user to finish on the consent page
pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// What the consent surface returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// The provider redirected to the callback scheme
    Callback(Url),
    /// The user closed the surface
    Cancelled,
}

/// Presents an authorization URL to the user
#[async_trait]
pub trait ConsentSurface: Send + Sync {
    /// Show `url` and wait for a redirect whose scheme is `callback_scheme`
    async fn present(&self, url: &Url, callback_scheme: &str) -> Result<ConsentOutcome>;
}

type Opener = dyn Fn(&Url) -> std::result::Result<(), String> + Send + Sync;

struct Waiter {
    id: u64,
    state: Option<String>,
    scheme: String,
    tx: oneshot::Sender<ConsentOutcome>,
}

#[derive(Default)]
struct Waiters {
    next_id: AtomicU64,
    pending: Mutex<Vec<Waiter>>,
}

impl Waiters {
    fn register(&self, state: Option<String>, scheme: &str) -> (u64, oneshot::Receiver<ConsentOutcome>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(Waiter {
                id,
                state,
                scheme: scheme.to_ascii_lowercase(),
                tx,
            });
        }
        (id, rx)
    }

    fn remove(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|w| w.id != id);
        }
    }

    fn take_for(&self, callback: &Url) -> Option<Waiter> {
        let mut pending = self.pending.lock().ok()?;
        pending.retain(|w| !w.tx.is_closed());
        let state = query_param(callback, "state");

        let by_state = pending
            .iter()
            .position(|w| w.scheme == callback.scheme() && state.is_some() && w.state == state);
        // Unknown state still goes to the latest attempt on that scheme so the
        // flow engine can reject it.
        let index = by_state.or_else(|| pending.iter().rposition(|w| w.scheme == callback.scheme()))?;
        Some(pending.remove(index))
    }

    fn take_latest(&self) -> Option<Waiter> {
        let mut pending = self.pending.lock().ok()?;
        pending.retain(|w| !w.tx.is_closed());
        pending.pop()
    }
}

/// Unregisters a waiter when its `present` call ends, including when the
/// call is dropped mid-wait
struct WaiterGuard<'a> {
    waiters: &'a Waiters,
    id: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.waiters.remove(self.id);
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Consent surface fed by the host's URL-handling entry point
pub struct ChannelConsent {
    opener: Box<Opener>,
    waiters: Arc<Waiters>,
    timeout: Duration,
}

impl std::fmt::Debug for ChannelConsent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConsent")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Sender side of a [`ChannelConsent`], held by the URL-handling entry point
#[derive(Clone)]
pub struct CallbackHandle {
    waiters: Arc<Waiters>,
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").finish_non_exhaustive()
    }
}

impl ChannelConsent {
    /// Create a surface that calls `opener` to display each authorization URL
    pub fn new<F>(opener: F) -> (Self, CallbackHandle)
    where
        F: Fn(&Url) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let waiters = Arc::new(Waiters::default());
        (
            Self {
                opener: Box::new(opener),
                waiters: waiters.clone(),
                timeout: DEFAULT_CONSENT_TIMEOUT,
            },
            CallbackHandle { waiters },
        )
    }

    /// Override how long to wait for a callback
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ConsentSurface for ChannelConsent {
    async fn present(&self, url: &Url, callback_scheme: &str) -> Result<ConsentOutcome> {
        let (id, rx) = self
            .waiters
            .register(query_param(url, "state"), callback_scheme);
        let _guard = WaiterGuard {
            waiters: &self.waiters,
            id,
        };

        (self.opener)(url).map_err(|e| {
            LinkupError::consent(format!("could not open authorization page: {e}"))
        })?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(LinkupError::consent("callback channel closed")),
            Err(_) => Err(LinkupError::consent(format!(
                "timed out after {}s waiting for the callback",
                self.timeout.as_secs()
            ))),
        }
    }
}

impl CallbackHandle {
    /// Deliver an intercepted callback URL.
    ///
    /// Returns `false` when no login attempt is waiting on the URL's scheme,
    /// meaning the URL is ordinary navigation for the host to handle.
    pub fn deliver(&self, callback: Url) -> bool {
        match self.waiters.take_for(&callback) {
            Some(waiter) => {
                tracing::debug!(scheme = callback.scheme(), "Routing OAuth callback");
                waiter.tx.send(ConsentOutcome::Callback(callback)).is_ok()
            }
            None => false,
        }
    }

    /// Parse and deliver a raw callback string
    pub fn deliver_str(&self, callback: &str) -> Result<bool> {
        let url = Url::parse(callback).map_err(|e| LinkupError::invalid_callback(e.to_string()))?;
        Ok(self.deliver(url))
    }

    /// Report that the user closed the most recent consent surface
    pub fn cancel(&self) -> bool {
        match self.waiters.take_latest() {
            Some(waiter) => waiter.tx.send(ConsentOutcome::Cancelled).is_ok(),
            None => false,
        }
    }
}

/// Open URL in the default browser
pub fn open_in_browser(url: &Url) -> std::result::Result<(), String> {
    let url = url.as_str();

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .map_err(|e| e.to_string())?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map_err(|e| e.to_string())?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_url(state: &str) -> Url {
        Url::parse(&format!("https://provider.test/authorize?state={state}")).unwrap()
    }

    #[tokio::test]
    async fn test_delivered_callback_reaches_waiter() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));
        let consent = Arc::new(consent);

        let waiting = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("s1"), "linkup").await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.deliver_str("linkup://auth/callback?code=c&state=s1").unwrap());
        let outcome = waiting.await.unwrap().unwrap();
        assert!(matches!(outcome, ConsentOutcome::Callback(u) if u.scheme() == "linkup"));
    }

    #[tokio::test]
    async fn test_foreign_scheme_is_not_intercepted() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));
        let consent = Arc::new(consent.with_timeout(Duration::from_millis(200)));

        let waiting = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("s1"), "linkup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!handle.deliver_str("https://example.com/?code=c&state=s1").unwrap());
        assert!(matches!(waiting.await.unwrap(), Err(LinkupError::Consent(_))));
    }

    #[tokio::test]
    async fn test_cancel_resolves_waiter() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));
        let consent = Arc::new(consent);

        let waiting = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("s1"), "linkup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.cancel());
        assert_eq!(waiting.await.unwrap().unwrap(), ConsentOutcome::Cancelled);
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn test_callbacks_route_by_state() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));
        let consent = Arc::new(consent);

        let first = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("aaa"), "linkup").await })
        };
        let second = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("bbb"), "linkup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(handle.deliver_str("linkup://cb?code=1&state=aaa").unwrap());
        assert!(handle.deliver_str("linkup://cb?code=2&state=bbb").unwrap());

        let ConsentOutcome::Callback(a) = first.await.unwrap().unwrap() else {
            panic!("expected callback");
        };
        let ConsentOutcome::Callback(b) = second.await.unwrap().unwrap() else {
            panic!("expected callback");
        };
        assert_eq!(query_param(&a, "code").as_deref(), Some("1"));
        assert_eq!(query_param(&b, "code").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_opener_failure_is_consent_error() {
        let (consent, handle) = ChannelConsent::new(|_| Err("no browser".to_string()));
        let result = consent.present(&auth_url("s1"), "linkup").await;
        assert!(matches!(result, Err(LinkupError::Consent(_))));
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_swallow_cancel() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));
        let consent = Arc::new(consent);

        let live = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("live"), "linkup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let abandoned = {
            let consent = consent.clone();
            tokio::spawn(async move { consent.present(&auth_url("gone"), "linkup").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());

        assert!(handle.cancel());
        assert_eq!(live.await.unwrap().unwrap(), ConsentOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_dropped_wait_unregisters() {
        let (consent, handle) = ChannelConsent::new(|_| Ok(()));

        let outer = tokio::time::timeout(
            Duration::from_millis(20),
            consent.present(&auth_url("s1"), "linkup"),
        )
        .await;
        assert!(outer.is_err());

        assert!(!handle.deliver_str("linkup://auth/callback?code=c&state=s1").unwrap());
        assert!(!handle.cancel());
    }
}
