//! OAuth 2.0 authorization-code flow engine with optional PKCE
//!
//! One [`OAuthFlowEngine`] drives the flow for one provider:
//!
//! ```text
//! Idle --begin_flow--> AwaitingCallback --validate_callback--> Exchanging --exchange--> Authenticated
//!   ^                        |                                     |
//!   +---- mismatch / missing code / abandon ------------------------+---- exchange failure
//! ```
//!
//! The pending [`AuthorizationRequest`] is taken out of the engine as soon as
//! a callback is consumed, so a state token can never be used twice. Starting
//! a new flow replaces any pending request, and callbacks carrying the old
//! state are rejected.

use std::sync::Mutex;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use typed_builder::TypedBuilder;
use url::Url;

use super::pkce::{CODE_CHALLENGE_METHOD, PkcePair};
use crate::error::{LinkupError, Result};
use crate::types::wire::TokenErrorResponse;
use crate::types::{Platform, TokenResponse};

/// Provider-specific parameters for one authorization flow
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct AuthConfig {
    /// Provider the flow authenticates against
    pub platform: Platform,
    /// Authorization endpoint shown on the consent surface
    pub authorize_url: Url,
    /// Token endpoint for the code exchange
    pub token_url: Url,
    /// OAuth client id
    #[builder(setter(into))]
    pub client_id: String,
    /// Client secret; sent in the token request body when present
    #[builder(default, setter(strip_option, into))]
    pub client_secret: Option<String>,
    /// Registered redirect URI
    #[builder(setter(into))]
    pub redirect_uri: String,
    /// Custom URI scheme the consent surface intercepts
    #[builder(setter(into))]
    pub callback_scheme: String,
    /// Scopes to request
    #[builder(default)]
    pub scopes: Vec<String>,
    /// Whether to send a PKCE S256 challenge
    #[builder(default)]
    pub pkce_required: bool,
}

impl AuthConfig {
    /// Space-separated scope string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Where an engine is in the authorization sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No attempt in progress
    Idle,
    /// Authorization URL issued, waiting for the redirect
    AwaitingCallback,
    /// Callback accepted, token request in flight
    Exchanging,
    /// Last attempt produced a token
    Authenticated,
}

/// In-memory record of one flow attempt
#[derive(Clone)]
pub struct AuthorizationRequest {
    attempt: u64,
    state: String,
    code_verifier: Option<String>,
    config: AuthConfig,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("platform", &self.config.platform)
            .field("attempt", &self.attempt)
            .field("pkce", &self.code_verifier.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthorizationRequest {
    /// State token round-tripped through the redirect
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// PKCE verifier, when the provider requires PKCE
    #[must_use]
    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    /// Configuration the attempt was started with
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Returned by [`OAuthFlowEngine::begin_flow`]: what to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// Fully built authorization URL
    pub url: Url,
    /// State token embedded in `url`
    pub state: String,
    /// Scheme the consent surface must intercept
    pub callback_scheme: String,
}

/// A callback that passed state validation, ready for token exchange
#[derive(Debug)]
pub struct ValidatedCallback {
    code: String,
    request: AuthorizationRequest,
}

impl ValidatedCallback {
    /// Authorization code from the callback
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

#[derive(Debug)]
struct FlowInner {
    state: FlowState,
    attempt: u64,
    pending: Option<AuthorizationRequest>,
}

/// Drives authorization attempts for one provider
#[derive(Debug)]
pub struct OAuthFlowEngine {
    http_client: reqwest::Client,
    inner: Mutex<FlowInner>,
}

impl Default for OAuthFlowEngine {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl OAuthFlowEngine {
    /// Create an engine that exchanges codes with `http_client`
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            inner: Mutex::new(FlowInner {
                state: FlowState::Idle,
                attempt: 0,
                pending: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FlowInner> {
        // A poisoned lock only means a panic elsewhere; the inner data is plain state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current position in the flow
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.lock().state
    }

    /// Whether an authorization request is waiting for its callback
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Start a new attempt, superseding any pending one
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the client id, redirect URI or callback scheme is empty.
    pub fn begin_flow(&self, config: &AuthConfig) -> Result<PendingAuthorization> {
        if config.client_id.trim().is_empty() {
            return Err(LinkupError::configuration(format!(
                "{} client_id is empty",
                config.platform
            )));
        }
        if config.redirect_uri.trim().is_empty() {
            return Err(LinkupError::configuration(format!(
                "{} redirect_uri is empty",
                config.platform
            )));
        }
        if config.callback_scheme.trim().is_empty() {
            return Err(LinkupError::configuration(format!(
                "{} callback scheme is empty",
                config.platform
            )));
        }

        let state = generate_state();
        let pkce = config.pkce_required.then(PkcePair::generate);
        let url = build_authorization_url(config, &state, pkce.as_ref().map(|p| p.challenge.as_str()));

        let mut inner = self.lock();
        if inner.pending.is_some() {
            tracing::debug!(platform = %config.platform, "Superseding pending authorization request");
        }
        inner.attempt += 1;
        inner.pending = Some(AuthorizationRequest {
            attempt: inner.attempt,
            state: state.clone(),
            code_verifier: pkce.map(|p| p.verifier),
            config: config.clone(),
        });
        inner.state = FlowState::AwaitingCallback;
        tracing::debug!(platform = %config.platform, pkce = config.pkce_required, "Authorization flow started");

        Ok(PendingAuthorization {
            url,
            state,
            callback_scheme: config.callback_scheme.clone(),
        })
    }

    /// Check a callback against the pending request and consume it
    ///
    /// On any failure the engine returns to `Idle` and the pending request is discarded.
    ///
    /// # Errors
    ///
    /// `StateMismatch` if nothing is pending or the state differs,
    /// `CallbackMissingCode` if the provider sent no code.
    pub fn validate_callback(&self, callback: &Url) -> Result<ValidatedCallback> {
        let mut inner = self.lock();
        let pending = inner.pending.take();
        let params: Vec<(String, String)> = callback.query_pairs().into_owned().collect();
        let param = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };
        let received_state = param("state");

        let Some(request) = pending else {
            inner.state = FlowState::Idle;
            tracing::warn!("OAuth callback received with no pending authorization request");
            return Err(LinkupError::state_mismatch(None, received_state));
        };

        let Some(code) = param("code").filter(|c| !c.is_empty()) else {
            inner.state = FlowState::Idle;
            let error = param("error");
            tracing::warn!(platform = %request.config.platform, error = ?error, "OAuth callback carried no code");
            return Err(LinkupError::CallbackMissingCode {
                error,
                description: param("error_description"),
            });
        };

        if received_state.as_deref() != Some(request.state.as_str()) {
            inner.state = FlowState::Idle;
            tracing::warn!(
                platform = %request.config.platform,
                "State mismatch in OAuth callback, possible CSRF"
            );
            return Err(LinkupError::state_mismatch(
                Some(request.state),
                received_state,
            ));
        }

        inner.state = FlowState::Exchanging;
        Ok(ValidatedCallback { code, request })
    }

    /// Exchange a validated code for tokens (single attempt, no retry)
    ///
    /// # Errors
    ///
    /// `TokenExchangeFailed` on network errors, non-2xx responses or undecodable bodies.
    pub async fn exchange(&self, validated: ValidatedCallback) -> Result<TokenResponse> {
        let ValidatedCallback { code, request } = validated;
        let result = self.request_token(&code, &request).await;

        let mut inner = self.lock();
        // A newer attempt owns the state machine now.
        if inner.attempt == request.attempt {
            inner.state = if result.is_ok() {
                FlowState::Authenticated
            } else {
                FlowState::Idle
            };
        }
        drop(inner);

        match &result {
            Ok(_) => tracing::info!(platform = %request.config.platform, "Token exchange succeeded"),
            Err(e) => tracing::warn!(platform = %request.config.platform, "Token exchange failed: {e}"),
        }
        result
    }

    /// Validate a callback and exchange its code in one step
    pub async fn complete(&self, callback: &Url) -> Result<TokenResponse> {
        let validated = self.validate_callback(callback)?;
        self.exchange(validated).await
    }

    /// Abandon the attempt identified by `state` (e.g. consent surface closed).
    ///
    /// Returns `false` if that attempt is no longer pending.
    pub fn abandon(&self, state: &str) -> bool {
        let mut inner = self.lock();
        let matches = inner
            .pending
            .as_ref()
            .is_some_and(|p| p.state == state);
        if matches {
            inner.pending = None;
            inner.state = FlowState::Idle;
            tracing::debug!("Authorization attempt abandoned");
        }
        matches
    }

    /// Discard whatever is pending and return to `Idle`
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.pending = None;
        inner.state = FlowState::Idle;
    }

    async fn request_token(&self, code: &str, request: &AuthorizationRequest) -> Result<TokenResponse> {
        let config = &request.config;
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        if let Some(verifier) = request.code_verifier.as_deref() {
            form.push(("code_verifier", verifier));
        }

        let response = self
            .http_client
            .post(config.token_url.clone())
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| LinkupError::token_exchange(format!("request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LinkupError::token_exchange(format!("reading response failed: {e}")))?;

        if !status.is_success() {
            let msg = match serde_json::from_str::<TokenErrorResponse>(&response_text) {
                Ok(error) => error.error_description.unwrap_or(error.error),
                Err(_) => response_text,
            };
            return Err(LinkupError::token_exchange(format!(
                "status {}: {msg}",
                status.as_u16()
            )));
        }

        serde_json::from_str::<TokenResponse>(&response_text).map_err(|e| {
            LinkupError::token_exchange(format!("failed to parse token response: {e}"))
        })
    }
}

/// Generate an unpredictable state token (32 random bytes, base64url)
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn build_authorization_url(
    config: &AuthConfig,
    state: &str,
    code_challenge: Option<&str>,
) -> Url {
    let scope = config.scope_string();
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", scope.as_str()),
        ("state", state),
    ];
    if let Some(challenge) = code_challenge {
        params.push(("code_challenge", challenge));
        params.push(("code_challenge_method", CODE_CHALLENGE_METHOD));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", encode_param(v)))
        .collect::<Vec<_>>()
        .join("&");

    let mut url = config.authorize_url.clone();
    url.set_query(Some(&query));
    url
}

/// Form-encode a query value, with spaces as `%20` so scope lists read the
/// same to every provider
fn encode_param(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
