//! Jenifesto-Store: key-value persistence for Jenifesto
//!
//! This crate owns all I/O with SurrealDB. Everything above it (the TTL
//! cache and the session record) sees only the [`KvStore`] trait.
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `KvStore`: async get/set/remove of JSON values by string key
//! - `SurrealKvStore`: SurrealDB implementation (memory, on-disk, remote)
//! - `fakes`: `MemoryKvStore` and `UnavailableKvStore` for tests

mod error;
pub mod fakes;
mod handle;
pub mod storage_traits;

pub use error::StoreError;
pub use handle::{StoreConfig, StoreCredentials, SurrealKvStore};
pub use storage_traits::{KvStore, StoreResult};
