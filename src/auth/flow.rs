//! Opener-side authorization flow.
//!
//! [`Authorizer::begin_authorization`] opens the popup at Google's
//! authorization endpoint and hands back a [`PendingAuthorization`] that
//! waits for exactly one outcome. Delivery can arrive over the direct relay
//! or through the durable fallback keys; popup closure without a result is
//! the cancellation signal, detected by a coarse poll.

use super::relay::{relay_channel, take_fallback, CredentialBundle, RelayPayload, RelayReceiver, RelaySender};
use super::request::AuthorizationRequest;
use super::AuthError;
use crate::config::Settings;
use crate::store::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// How often the popup is checked for closure.
pub const CLOSURE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Window after closure during which a late in-flight result is honored.
pub const CLOSURE_GRACE: Duration = Duration::from_millis(500);

/// States of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Opened,
    Delivering,
    Delivered,
    Failed,
    Cancelled,
}

/// Shared, observable flow state.
pub type FlowStateCell = Arc<Mutex<FlowState>>;

/// Handle onto a child browsing context.
pub trait ChildContext {
    /// Whether the context has been closed (by the user or otherwise).
    fn is_closed(&self) -> bool;
}

/// Opens child browsing contexts.
pub trait ContextOpener {
    fn open(&self, url: &Url) -> Result<Box<dyn ChildContext>, AuthError>;
}

/// Opens the authorization URL in the system browser.
///
/// A browser tab opened this way cannot be observed, so `is_closed` always
/// reports `false`; cancellation then only happens through the caller
/// abandoning the wait.
pub struct BrowserOpener;

struct BrowserTab;

impl ChildContext for BrowserTab {
    fn is_closed(&self) -> bool {
        false
    }
}

impl ContextOpener for BrowserOpener {
    fn open(&self, url: &Url) -> Result<Box<dyn ChildContext>, AuthError> {
        webbrowser::open(url.as_str())
            .map_err(|e| AuthError::PopupBlocked(e.to_string()))?;
        Ok(Box::new(BrowserTab))
    }
}

/// Starts authorization attempts.
pub struct Authorizer<'a> {
    settings: &'a Settings,
    opener: &'a dyn ContextOpener,
    store: &'a dyn KeyValueStore,
}

impl<'a> Authorizer<'a> {
    /// Create an authorizer over injected collaborators.
    pub fn new(
        settings: &'a Settings,
        opener: &'a dyn ContextOpener,
        store: &'a dyn KeyValueStore,
    ) -> Self {
        Self {
            settings,
            opener,
            store,
        }
    }

    /// Generate a fresh request, open the popup, and register the relay.
    ///
    /// The returned [`RelaySender`] is the handle the popup context posts
    /// results through when it shares a process with the opener.
    pub fn begin_authorization(
        &self,
    ) -> Result<(PendingAuthorization<'a>, RelaySender), AuthError> {
        let state = Arc::new(Mutex::new(FlowState::Idle));

        let request = AuthorizationRequest::new(&self.settings.google);
        let url = request.authorize_url()?;

        let child = self.opener.open(&url)?;
        *state.lock() = FlowState::Opened;
        info!("authorization popup opened");

        let (sender, receiver) = relay_channel(&self.settings.frontend_origin);

        Ok((
            PendingAuthorization {
                request,
                child,
                receiver,
                store: self.store,
                state,
            },
            sender,
        ))
    }
}

/// One in-flight authorization attempt.
pub struct PendingAuthorization<'a> {
    request: AuthorizationRequest,
    child: Box<dyn ChildContext>,
    receiver: RelayReceiver,
    store: &'a dyn KeyValueStore,
    state: FlowStateCell,
}

impl PendingAuthorization<'_> {
    /// The request this attempt was started with.
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Current flow state.
    pub fn state(&self) -> FlowState {
        *self.state.lock()
    }

    /// A shared cell for observing state transitions from elsewhere.
    pub fn state_cell(&self) -> FlowStateCell {
        Arc::clone(&self.state)
    }

    /// Wait for the single terminal outcome of this attempt.
    ///
    /// Consumes the attempt, so nothing can be accepted from it afterwards.
    pub async fn wait(mut self) -> Result<CredentialBundle, AuthError> {
        loop {
            // Fallback keys may have been written while we slept
            if let Some(tokens) = take_fallback(self.store)? {
                debug!("credential bundle consumed from fallback storage");
                return self.finish(RelayPayload::Success { tokens });
            }

            if self.child.is_closed() {
                // Allow a late in-flight message before reporting cancellation
                if let Ok(Some(payload)) =
                    tokio::time::timeout(CLOSURE_GRACE, self.receiver.recv()).await
                {
                    return self.finish(payload);
                }
                if let Some(tokens) = take_fallback(self.store)? {
                    return self.finish(RelayPayload::Success { tokens });
                }
                warn!("popup closed before a result was delivered");
                *self.state.lock() = FlowState::Cancelled;
                return Err(AuthError::Cancelled);
            }

            match tokio::time::timeout(CLOSURE_POLL_INTERVAL, self.receiver.recv()).await {
                Ok(Some(payload)) => return self.finish(payload),
                // All senders gone; keep polling fallback and closure
                Ok(None) => tokio::time::sleep(CLOSURE_POLL_INTERVAL).await,
                // Poll tick elapsed
                Err(_) => {}
            }
        }
    }

    fn finish(self, payload: RelayPayload) -> Result<CredentialBundle, AuthError> {
        *self.state.lock() = FlowState::Delivering;
        match payload {
            RelayPayload::Success { tokens } => {
                info!("credential bundle delivered");
                *self.state.lock() = FlowState::Delivered;
                Ok(tokens)
            }
            RelayPayload::Error { error } => {
                warn!(error = %error, "popup relayed an error");
                *self.state.lock() = FlowState::Failed;
                Err(AuthError::Relayed(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::relay::write_fallback;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakePopup {
        closed: Arc<AtomicBool>,
    }

    impl ChildContext for FakePopup {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    /// Opener yielding a scriptable popup, or failing like a popup blocker.
    struct FakeOpener {
        closed: Arc<AtomicBool>,
        blocked: bool,
    }

    impl FakeOpener {
        fn new() -> Self {
            Self {
                closed: Arc::new(AtomicBool::new(false)),
                blocked: false,
            }
        }

        fn blocked() -> Self {
            Self {
                closed: Arc::new(AtomicBool::new(false)),
                blocked: true,
            }
        }
    }

    impl ContextOpener for FakeOpener {
        fn open(&self, _url: &Url) -> Result<Box<dyn ChildContext>, AuthError> {
            if self.blocked {
                return Err(AuthError::PopupBlocked("blocked by test".to_string()));
            }
            Ok(Box::new(FakePopup {
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn bundle(token: &str) -> CredentialBundle {
        CredentialBundle {
            access_token: token.to_string(),
            refresh_token: None,
            expires_in: Some(3599),
            scope: None,
            token_type: Some("Bearer".to_string()),
        }
    }

    #[test]
    fn test_popup_blocked() {
        let settings = Settings::default();
        let opener = FakeOpener::blocked();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        assert!(matches!(
            authorizer.begin_authorization(),
            Err(AuthError::PopupBlocked(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_delivery() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, sender) = authorizer.begin_authorization().unwrap();
        assert_eq!(pending.state(), FlowState::Opened);
        let state = pending.state_cell();

        sender
            .post(RelayPayload::Success {
                tokens: bundle("at-direct"),
            })
            .unwrap();

        let tokens = pending.wait().await.unwrap();
        assert_eq!(tokens.access_token, "at-direct");
        assert_eq!(*state.lock(), FlowState::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_delivery_consumed_once() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, _sender) = authorizer.begin_authorization().unwrap();
        write_fallback(&store, &bundle("at-fallback")).unwrap();

        let tokens = pending.wait().await.unwrap();
        assert_eq!(tokens.access_token, "at-fallback");

        // Keys are gone; a future attempt cannot re-consume this bundle
        assert!(store.get("google_oauth_tokens").unwrap().is_none());
        assert!(store.get("google_oauth_success").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_bundle_across_both_paths() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, sender) = authorizer.begin_authorization().unwrap();

        // Both paths race for the same attempt
        write_fallback(&store, &bundle("at-race")).unwrap();
        sender
            .post(RelayPayload::Success {
                tokens: bundle("at-race"),
            })
            .unwrap();

        let tokens = pending.wait().await.unwrap();
        assert_eq!(tokens.access_token, "at-race");

        // The fallback copy was cleared, so the losing path delivers nothing
        assert!(take_fallback(&store).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_when_popup_closes() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, _sender) = authorizer.begin_authorization().unwrap();
        let state = pending.state_cell();
        opener.closed.store(true, Ordering::SeqCst);

        let started = tokio::time::Instant::now();
        let result = pending.wait().await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
        assert_eq!(*state.lock(), FlowState::Cancelled);

        // Detected within poll interval + grace
        assert!(started.elapsed() <= CLOSURE_POLL_INTERVAL + CLOSURE_GRACE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_message_beats_cancellation() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, sender) = authorizer.begin_authorization().unwrap();

        // Message is already in flight when the popup closes
        sender
            .post(RelayPayload::Success {
                tokens: bundle("at-late"),
            })
            .unwrap();
        opener.closed.store(true, Ordering::SeqCst);

        let tokens = pending.wait().await.unwrap();
        assert_eq!(tokens.access_token, "at-late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_origin_never_delivers() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, sender) = authorizer.begin_authorization().unwrap();
        let spoof = RelaySender::with_origin(sender.raw(), "http://evil.example");
        spoof
            .post(RelayPayload::Success {
                tokens: bundle("at-spoofed"),
            })
            .unwrap();

        // The spoofed bundle is dropped; closing the popup cancels the flow
        opener.closed.store(true, Ordering::SeqCst);
        assert!(matches!(pending.wait().await, Err(AuthError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relayed_error_fails_flow() {
        let settings = Settings::default();
        let opener = FakeOpener::new();
        let store = MemoryStore::new();
        let authorizer = Authorizer::new(&settings, &opener, &store);

        let (pending, sender) = authorizer.begin_authorization().unwrap();
        let state = pending.state_cell();
        sender
            .post(RelayPayload::Error {
                error: "access_denied".to_string(),
            })
            .unwrap();

        match pending.wait().await {
            Err(AuthError::Relayed(message)) => assert_eq!(message, "access_denied"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(*state.lock(), FlowState::Failed);
    }
}
