//! Authorization request construction.

use super::state::{generate_state, STATE_LENGTH};
use super::AuthError;
use crate::config::GoogleOAuthSettings;
use url::Url;

/// Google's authorization endpoint.
pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Ephemeral per-attempt authorization request.
///
/// Created when a flow starts, never persisted, discarded once the attempt
/// reaches a terminal outcome.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// CSRF nonce, echoed back by the provider and forwarded to the backend
    /// with the code exchange.
    pub state: String,
    pub response_type: &'static str,
    pub access_type: &'static str,
    pub prompt: &'static str,
}

impl AuthorizationRequest {
    /// Build a request with a fresh state nonce.
    pub fn new(google: &GoogleOAuthSettings) -> Self {
        Self {
            client_id: google.client_id.clone(),
            redirect_uri: google.redirect_uri.clone(),
            scopes: google.scopes.clone(),
            state: generate_state(STATE_LENGTH),
            response_type: "code",
            access_type: "offline",
            prompt: "consent",
        }
    }

    /// Build the provider authorization URL for this request.
    pub fn authorize_url(&self) -> Result<Url, AuthError> {
        let mut url = Url::parse(GOOGLE_AUTHORIZE_URL)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("response_type", self.response_type)
            .append_pair("state", &self.state)
            .append_pair("access_type", self.access_type)
            .append_pair("prompt", self.prompt);
        Ok(url)
    }
}
