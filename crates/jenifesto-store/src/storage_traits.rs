//! Storage trait definitions for Jenifesto
//!
//! A single abstraction backs both the TTL cache and session persistence:
//! - `KvStore`: durable string-keyed JSON values (get/set/remove)
//!
//! The trait is async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable key-value store.
///
/// Guarantees:
/// - `get(key)` returns the value from the most recent `set(key, _)`, or
///   `None` if the key was never written or has been removed.
/// - `set` overwrites unconditionally (last write wins).
/// - `remove` is a no-op for absent keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Delete `key`. No-op if absent.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
