//! Durable key-value storage.
//!
//! The OAuth relay fallback keys and the session token are shared state
//! between otherwise independent contexts (the opener and the popup, or two
//! runs of the CLI). They live behind the [`KeyValueStore`] trait so the
//! relay and session code never touch storage globals directly and tests can
//! substitute an in-memory store.

use crate::db::Database;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// String key-value storage with last-write-wins semantics.
pub trait KeyValueStore {
    /// Read a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store over the `kv` table.
pub struct SqliteStore<'a> {
    db: &'a Database,
}

impl<'a> SqliteStore<'a> {
    /// Create a store over an open database.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteStore<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.db.conn().query_row(
            "SELECT value FROM kv WHERE key = ?",
            [key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.conn().execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, unixepoch())
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.db
            .conn()
            .execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }
}

/// In-memory store for tests and fakes.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn check_store(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);

        // Removing an absent key is fine
        store.remove("a").unwrap();
    }

    #[test]
    fn test_memory_store() {
        check_store(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open_at(tmp.path().join("kv.db")).unwrap();
        db.migrate().unwrap();
        check_store(&SqliteStore::new(&db));
    }
}
