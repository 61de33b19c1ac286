//! The key/value storage capability (§11).
//!
//! Everything above this module — books, segments, operations, the event
//! log — is persisted as JSON blobs behind prefixed text keys (§[`keys`]).
//! Nothing upstream is allowed to assume SQL: a `Store` is free to be
//! `SqliteStore`, an in-memory map for tests, or any other backend that can
//! answer a prefix scan.

pub mod error;
pub mod health;
pub mod keys;
pub mod memory;
pub mod migrations;
pub mod retry;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use health::ConnectionHealth;
pub use memory::MemoryStore;
pub use retry::{RetryExecutor, RetryPolicy};
pub use sqlite::SqliteStore;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A single write in a [`Store::batch`] call.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl BatchOp {
    #[must_use]
    pub fn put(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Put { key: key.into(), value }
    }

    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Minimal key/value capability the rest of the engine depends on.
///
/// `scan_prefix` returns entries in key order, which is also id order since
/// every id this engine mints (`crate::ids::new_id`) is time-sortable.
pub trait Store: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Returns every `(key, value)` pair whose key starts with `prefix`,
    /// ordered lexically by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Applies every op atomically; either all succeed or none do.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or the batch
    /// cannot be committed.
    fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;

    /// Atomically increments `counter` by one and returns the new value.
    /// Used for operation log sequence numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn increment(&self, counter: &str) -> StoreResult<i64>;

    /// Drops every key. Used by `FactoryReset` (§6.2).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn wipe(&self) -> StoreResult<()>;

    /// Deserializes the value at `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or the stored
    /// bytes are not valid JSON for `T`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Serializes `value` as JSON and writes it at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or `value` cannot
    /// be serialized.
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, &bytes)
    }

    /// Deserializes every value returned by `scan_prefix(prefix)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or any stored
    /// value is not valid JSON for `T`.
    fn scan_prefix_json<T: DeserializeOwned>(&self, prefix: &str) -> StoreResult<Vec<T>> {
        self.scan_prefix(prefix)?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .collect()
    }
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        (**self).scan_prefix(prefix)
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        (**self).batch(ops)
    }

    fn increment(&self, counter: &str) -> StoreResult<i64> {
        (**self).increment(counter)
    }

    fn wipe(&self) -> StoreResult<()> {
        (**self).wipe()
    }
}
