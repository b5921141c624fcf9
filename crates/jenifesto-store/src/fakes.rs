//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryKvStore`, which satisfies the `KvStore` contract without
//! any external dependencies, and `UnavailableKvStore`, which fails every
//! call the way an unreachable backend would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryKvStore
// ---------------------------------------------------------------------------

/// In-memory key-value store backed by a `HashMap<key, value>`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Value>>,
    writes: AtomicU64,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of `set` calls observed.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UnavailableKvStore
// ---------------------------------------------------------------------------

/// A store whose backend is permanently unreachable.
#[derive(Debug, Default)]
pub struct UnavailableKvStore {
    attempts: AtomicU64,
}

impl UnavailableKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that were attempted (and failed).
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> StoreResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("backend offline".to_string()))
    }
}

#[async_trait]
impl KvStore for UnavailableKvStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<Value>> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: Value) -> StoreResult<()> {
        self.fail()
    }

    async fn remove(&self, _key: &str) -> StoreResult<()> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_tracks_writes() {
        let store = MemoryKvStore::new();
        assert!(store.is_empty());

        store.set("a", json!(1)).await.unwrap();
        store.set("a", json!(2)).await.unwrap();
        store.set("b", json!(3)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.write_count(), 3);
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn unavailable_store_counts_attempts() {
        let store = UnavailableKvStore::new();
        assert!(store.get("k").await.is_err());
        assert!(store.set("k", json!(null)).await.is_err());
        assert!(store.remove("k").await.is_err());
        assert_eq!(store.attempts(), 3);
    }
}
