//! Backend session token storage.
//!
//! The access token returned by login/registration is kept under the same
//! well-known key the web client used, so a session survives restarts.

use crate::store::{KeyValueStore, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key for the backend session token.
pub const SESSION_TOKEN_KEY: &str = "dream_job_search_token";

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A stored backend session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub expires_at: Option<i64>,
    pub updated_at: i64,
}

impl StoredSession {
    /// Check if the session is expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    /// Check if the session will expire within the given seconds.
    pub fn expires_within(&self, seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() >= expires_at - seconds,
            None => false,
        }
    }
}

/// Session token storage over a [`KeyValueStore`].
pub struct SessionStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> SessionStore<'a> {
    /// Create a session store.
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Save a session token.
    pub fn save(&self, access_token: &str, expires_in: Option<u64>) -> Result<(), SessionError> {
        let now = Utc::now().timestamp();
        let session = StoredSession {
            access_token: access_token.to_string(),
            expires_at: expires_in.map(|secs| now + secs as i64),
            updated_at: now,
        };
        let encoded = serde_json::to_string(&session)?;
        self.store.set(SESSION_TOKEN_KEY, &encoded)?;
        Ok(())
    }

    /// Load the stored session, if any.
    pub fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        match self.store.get(SESSION_TOKEN_KEY)? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }

    /// Load the access token of a live session.
    pub fn access_token(&self) -> Result<Option<String>, SessionError> {
        Ok(self
            .load()?
            .filter(|session| !session.is_expired())
            .map(|session| session.access_token))
    }

    /// Delete the stored session (logout).
    pub fn clear(&self) -> Result<(), SessionError> {
        self.store.remove(SESSION_TOKEN_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store);

        assert!(sessions.load().unwrap().is_none());

        sessions.save("tok-123", Some(3600)).unwrap();
        let loaded = sessions.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok-123");
        assert!(!loaded.is_expired());
        assert!(loaded.expires_within(7200));

        assert_eq!(sessions.access_token().unwrap().as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_expired_session_yields_no_token() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store);

        sessions.save("tok-old", Some(0)).unwrap();
        assert!(sessions.access_token().unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store);

        sessions.save("tok", None).unwrap();
        sessions.clear().unwrap();
        assert!(sessions.load().unwrap().is_none());
    }
}
