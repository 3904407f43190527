//! Popup-side redirect callback handling.
//!
//! Google redirects the popup to the callback URL with the outcome encoded
//! in query-string and/or fragment parameters. The handler validates those
//! parameters, exchanges the code with the backend, and delivers the result
//! to the opener over the relay.

use super::relay::{write_fallback, CredentialBundle, RelayPayload, RelaySender};
use super::AuthError;
use crate::store::KeyValueStore;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// How long an undeliverable error is shown before the popup closes itself.
pub const ERROR_CLOSE_DELAY: Duration = Duration::from_secs(5);

/// Parameters extracted from the redirect URL.
///
/// Google may return values in the query string, the fragment, or both, so
/// the two namespaces are merged. Fragment values win on collision.
#[derive(Debug, Default)]
pub struct CallbackParams {
    params: HashMap<String, String>,
}

/// A validated authorization code plus the echoed CSRF state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub state: Option<String>,
}

impl CallbackParams {
    /// Extract parameters from a redirect URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params: HashMap<String, String> =
            url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
                params.insert(key.into_owned(), value.into_owned());
            }
        }
        Self { params }
    }

    /// Look up a single parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check for a provider error, then require an authorization code.
    pub fn validate(&self) -> Result<AuthorizationCode, AuthError> {
        if let Some(error) = self.get("error") {
            let message = self.get("error_description").unwrap_or(error);
            return Err(AuthError::ProviderDenied(message.to_string()));
        }

        match self.get("code") {
            Some(code) => Ok(AuthorizationCode {
                code: code.to_string(),
                state: self.get("state").map(str::to_string),
            }),
            None => Err(AuthError::MissingCode),
        }
    }
}

/// Terminal outcome of handling one redirect.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// The bundle reached the opener directly.
    Delivered,
    /// The opener was unreachable; the bundle was parked in durable storage
    /// and the user must close the popup manually.
    FallbackStored,
    /// The flow failed. The popup should show the error and close itself
    /// after `close_after`.
    Failed {
        error: AuthError,
        close_after: Duration,
    },
    /// The latch had already fired; nothing was done.
    AlreadyHandled,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    detail: Option<String>,
}

/// Drives the popup side of the flow exactly once.
pub struct CallbackHandler<'a> {
    http: reqwest::Client,
    backend_url: String,
    store: &'a dyn KeyValueStore,
    processed: AtomicBool,
}

impl<'a> CallbackHandler<'a> {
    /// Create a handler posting exchanges to the given backend.
    pub fn new(http: reqwest::Client, backend_url: &str, store: &'a dyn KeyValueStore) -> Self {
        Self {
            http,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            store,
            processed: AtomicBool::new(false),
        }
    }

    /// Handle the redirect. Runs the validate/exchange/deliver pipeline at
    /// most once per handler lifetime, even if the hosting context re-runs
    /// its setup.
    pub async fn handle(
        &self,
        redirect_url: &Url,
        opener: Option<&RelaySender>,
    ) -> CallbackOutcome {
        if self.processed.swap(true, Ordering::SeqCst) {
            debug!("callback already processed, ignoring re-invocation");
            return CallbackOutcome::AlreadyHandled;
        }

        match self.run(redirect_url, opener).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "OAuth callback failed");
                // Notify the opener when a channel exists; otherwise the
                // popup just shows the error and closes itself.
                if let Some(sender) = opener {
                    let _ = sender.post(RelayPayload::Error {
                        error: err.to_string(),
                    });
                }
                CallbackOutcome::Failed {
                    error: err,
                    close_after: ERROR_CLOSE_DELAY,
                }
            }
        }
    }

    async fn run(
        &self,
        redirect_url: &Url,
        opener: Option<&RelaySender>,
    ) -> Result<CallbackOutcome, AuthError> {
        let params = CallbackParams::from_url(redirect_url);
        let authorization = params.validate()?;

        info!("authorization code received, exchanging for tokens");
        let tokens = self.exchange(&authorization).await?;

        self.deliver(tokens, opener)
    }

    /// Exchange the code for tokens via the backend callback endpoint.
    async fn exchange(
        &self,
        authorization: &AuthorizationCode,
    ) -> Result<CredentialBundle, AuthError> {
        let url = format!("{}/api/auth/google/callback", self.backend_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "code": authorization.code,
                "state": authorization.state,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<BackendErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(AuthError::ExchangeFailed(message));
        }

        Ok(response.json::<CredentialBundle>().await?)
    }

    /// Hand the bundle to the opener, falling back to durable storage.
    fn deliver(
        &self,
        tokens: CredentialBundle,
        opener: Option<&RelaySender>,
    ) -> Result<CallbackOutcome, AuthError> {
        if let Some(sender) = opener {
            if sender
                .post(RelayPayload::Success {
                    tokens: tokens.clone(),
                })
                .is_ok()
            {
                info!("tokens sent to opener");
                return Ok(CallbackOutcome::Delivered);
            }
            warn!("opener unreachable, using storage fallback");
        } else {
            warn!("no opener, using storage fallback");
        }

        write_fallback(self.store, &tokens)?;
        Ok(CallbackOutcome::FallbackStored)
    }
}
