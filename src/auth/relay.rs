//! One-shot relay between the popup and the opener.
//!
//! The preferred path is a direct message channel, the moral equivalent of
//! `postMessage` between two same-origin windows. When the opener is gone or
//! the send fails, the popup falls back to durable storage under well-known
//! keys which the opener polls and consumes.
//!
//! Receivers drop any message whose origin differs from their own, so a
//! well-formed bundle from a foreign origin is never accepted.

use super::AuthError;
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fallback storage key holding the JSON-encoded credential bundle.
pub const FALLBACK_TOKENS_KEY: &str = "google_oauth_tokens";

/// Fallback storage key holding the freshness flag.
pub const FALLBACK_SUCCESS_KEY: &str = "google_oauth_success";

/// Tokens returned by the backend code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Relay message body, mirroring the cross-window wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayPayload {
    #[serde(rename = "GOOGLE_OAUTH_SUCCESS")]
    Success { tokens: CredentialBundle },
    #[serde(rename = "GOOGLE_OAUTH_ERROR")]
    Error { error: String },
}

/// A payload tagged with the origin of the sending context.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    pub origin: String,
    pub payload: RelayPayload,
}

/// Create a direct relay pair. The receiver only yields messages sent from
/// `origin`.
pub fn relay_channel(origin: &str) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RelaySender {
            tx,
            origin: origin.to_string(),
        },
        RelayReceiver {
            rx,
            expected_origin: origin.to_string(),
        },
    )
}

/// Sending half of the direct relay, held by the popup context.
#[derive(Debug, Clone)]
pub struct RelaySender {
    tx: mpsc::UnboundedSender<RelayMessage>,
    origin: String,
}

impl RelaySender {
    /// Construct a sender posting from an explicit origin. Only useful for
    /// exercising the receiver's origin filter.
    pub fn with_origin(tx: mpsc::UnboundedSender<RelayMessage>, origin: &str) -> Self {
        Self {
            tx,
            origin: origin.to_string(),
        }
    }

    /// Post a payload to the opener. Fails when the opener side is gone.
    pub fn post(&self, payload: RelayPayload) -> Result<(), AuthError> {
        self.tx
            .send(RelayMessage {
                origin: self.origin.clone(),
                payload,
            })
            .map_err(|_| AuthError::RelayUnreachable)
    }

    /// Whether the opener side is still listening.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// The raw sending handle, for wiring up additional senders in tests.
    pub fn raw(&self) -> mpsc::UnboundedSender<RelayMessage> {
        self.tx.clone()
    }
}

/// Receiving half of the direct relay, held by the opener context.
pub struct RelayReceiver {
    rx: mpsc::UnboundedReceiver<RelayMessage>,
    expected_origin: String,
}

impl RelayReceiver {
    /// Pull the next same-origin payload without waiting. Foreign-origin
    /// messages are discarded.
    pub fn try_recv(&mut self) -> Option<RelayPayload> {
        while let Ok(message) = self.rx.try_recv() {
            if message.origin == self.expected_origin {
                return Some(message.payload);
            }
            warn!(origin = %message.origin, "message from different origin, ignoring");
        }
        None
    }

    /// Wait for the next same-origin payload. Returns `None` once every
    /// sender is gone.
    pub async fn recv(&mut self) -> Option<RelayPayload> {
        while let Some(message) = self.rx.recv().await {
            if message.origin == self.expected_origin {
                return Some(message.payload);
            }
            warn!(origin = %message.origin, "message from different origin, ignoring");
        }
        None
    }
}

/// Write the bundle plus the freshness flag to durable storage.
///
/// The flag is written last so a polling opener never observes the flag
/// without the tokens.
pub fn write_fallback(
    store: &dyn KeyValueStore,
    bundle: &CredentialBundle,
) -> Result<(), AuthError> {
    let encoded = serde_json::to_string(bundle).expect("bundle serialize");
    store.set(FALLBACK_TOKENS_KEY, &encoded)?;
    store.set(FALLBACK_SUCCESS_KEY, "true")?;
    debug!("credential bundle written to fallback storage");
    Ok(())
}

/// Consume a fallback-delivered bundle, deleting both keys.
///
/// Deleting before returning makes a second delivery attempt a no-op, which
/// keeps the direct-versus-fallback race harmless. A bundle that fails to
/// parse is also cleared so it cannot wedge future attempts.
pub fn take_fallback(
    store: &dyn KeyValueStore,
) -> Result<Option<CredentialBundle>, AuthError> {
    if store.get(FALLBACK_SUCCESS_KEY)?.as_deref() != Some("true") {
        return Ok(None);
    }
    let encoded = store.get(FALLBACK_TOKENS_KEY)?;

    store.remove(FALLBACK_TOKENS_KEY)?;
    store.remove(FALLBACK_SUCCESS_KEY)?;

    match encoded.as_deref().map(serde_json::from_str) {
        Some(Ok(bundle)) => Ok(Some(bundle)),
        Some(Err(e)) => {
            warn!(error = %e, "discarding unparseable fallback tokens");
            Ok(None)
        }
        None => Ok(None),
    }
}
