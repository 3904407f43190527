//! Google OAuth authorization relay.
//!
//! The authorization-code flow runs in a child browsing context (the popup)
//! while the initiating context (the opener) waits for the result. The two
//! sides coordinate over a one-shot relay: a direct message channel when the
//! opener is reachable, and durable key-value fallback keys when it is not.
//!
//! - Opener side: [`flow::Authorizer`] opens the popup and
//!   [`flow::PendingAuthorization`] waits for exactly one credential bundle.
//! - Popup side: [`callback::CallbackHandler`] parses the redirect, exchanges
//!   the code with the backend, and delivers the outcome.

pub mod callback;
pub mod flow;
pub mod relay;
mod request;
mod state;

pub use relay::CredentialBundle;
pub use request::{AuthorizationRequest, GOOGLE_AUTHORIZE_URL};
pub use state::{generate_state, STATE_LENGTH};

use crate::store::StoreError;
use thiserror::Error;

/// Error type for the authorization flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The child context could not be created. The caller should surface
    /// this and allow a retry.
    #[error("Popup blocked: {0}")]
    PopupBlocked(String),

    /// Google redirected back with an `error` parameter.
    #[error("Google OAuth error: {0}")]
    ProviderDenied(String),

    /// The redirect carried neither a code nor an error.
    #[error("No authorization code received from Google")]
    MissingCode,

    /// The backend refused or failed the code exchange.
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// The popup closed before any result was delivered.
    #[error("Google authentication was cancelled")]
    Cancelled,

    /// The popup relayed an error to the opener.
    #[error("Google authentication failed: {0}")]
    Relayed(String),

    /// Direct delivery to the opener failed; the fallback path was engaged.
    #[error("Opener unreachable, fallback delivery engaged")]
    RelayUnreachable,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}
