//! TTL cache layered over the key-value store.
//!
//! Entries carry an absolute wall-clock expiry so they stay meaningful
//! across restarts. Expiry is checked lazily on read; nothing sweeps the
//! store. Any storage failure is logged and treated as a miss.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jenifesto_store::KvStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{EntityId, SourceType};
use crate::metrics::METRICS;

/// Source of "now" in Unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Logical query a cached value answers.
///
/// Keys are structured, never string-joined: the storage key is a digest
/// of the serialized form, so keywords containing separators cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum CacheKey {
    PrimaryEntity {
        id: EntityId,
    },
    Secondary {
        id: EntityId,
    },
    Tertiary {
        keyword: String,
        excluded: Vec<SourceType>,
        limit: usize,
    },
}

impl CacheKey {
    pub fn primary(id: &EntityId) -> Self {
        CacheKey::PrimaryEntity { id: id.clone() }
    }

    pub fn secondary(id: &EntityId) -> Self {
        CacheKey::Secondary { id: id.clone() }
    }

    /// Tier-3 key: keyword normalized, exclusions sorted and deduplicated,
    /// plus the per-source result bound.
    pub fn tertiary(keyword: &str, excluded: &[SourceType], limit: usize) -> Self {
        let mut excluded = excluded.to_vec();
        excluded.sort();
        excluded.dedup();
        CacheKey::Tertiary {
            keyword: normalize_keyword(keyword),
            excluded,
            limit,
        }
    }

    pub fn tier(&self) -> &'static str {
        match self {
            CacheKey::PrimaryEntity { .. } => "entity",
            CacheKey::Secondary { .. } => "tier2",
            CacheKey::Tertiary { .. } => "tier3",
        }
    }

    /// Key under which the entry is stored.
    pub fn storage_key(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = hex::encode(Sha256::digest(&canonical));
        format!("cache:{}:{}", self.tier(), digest)
    }
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stored envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub expires_at_ms: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Freshness cache shared by every tier.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fresh value for `key`, or `None` on miss, expiry, decode failure,
    /// or an unreachable store.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let storage_key = key.storage_key();
        let raw = match self.store.get(&storage_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                METRICS.inc_cache_errors();
                warn!(tier = key.tier(), error = %e, "cache unavailable, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(tier = key.tier(), error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        // Stale entries stay in place until the next `set` overwrites them.
        if !entry.is_fresh(self.clock.now_ms()) {
            debug!(tier = key.tier(), "cache entry expired");
            return None;
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(tier = key.tier(), error = %e, "cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`. Failures are logged, never returned.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(tier = key.tier(), error = %e, "value not cacheable");
                return;
            }
        };

        let entry = CacheEntry {
            value,
            expires_at_ms: self.clock.now_ms().saturating_add(ttl.as_millis() as i64),
        };

        let encoded = match serde_json::to_value(&entry) {
            Ok(v) => v,
            Err(e) => {
                warn!(tier = key.tier(), error = %e, "cache entry not encodable");
                return;
            }
        };

        if let Err(e) = self.store.set(&key.storage_key(), encoded).await {
            METRICS.inc_cache_errors();
            warn!(tier = key.tier(), error = %e, "cache unavailable, entry not stored");
        }
    }
}
