//! Global atomic counters for Jenifesto observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocation or locking on increment.
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    fanouts_launched: AtomicU64,
    source_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_errors: AtomicU64::new(0),
            fanouts_launched: AtomicU64::new(0),
            source_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_misses", "counter incremented");
    }

    /// Store unreachable or rejected a read/write.
    pub fn inc_cache_errors(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_errors", "counter incremented");
    }

    pub fn inc_fanouts(&self) {
        self.fanouts_launched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fanouts_launched", "counter incremented");
    }

    /// Add `n` sources that ended up in a `failed` bucket.
    pub fn add_source_failures(&self, n: u64) {
        self.source_failures.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "source_failures", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
            cache_errors = self.cache_errors(),
            fanouts_launched = self.fanouts_launched(),
            source_failures = self.source_failures(),
        );
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn cache_errors(&self) -> u64 {
        self.cache_errors.load(Ordering::Relaxed)
    }

    pub fn fanouts_launched(&self) -> u64 {
        self.fanouts_launched.load(Ordering::Relaxed)
    }

    pub fn source_failures(&self) -> u64 {
        self.source_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.cache_errors.store(0, Ordering::Relaxed);
        self.fanouts_launched.store(0, Ordering::Relaxed);
        self.source_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.cache_hits(), 0);
        m.inc_cache_hits();
        m.inc_cache_hits();
        assert_eq!(m.cache_hits(), 2);

        m.inc_cache_misses();
        assert_eq!(m.cache_misses(), 1);

        m.inc_fanouts();
        m.add_source_failures(3);
        assert_eq!(m.fanouts_launched(), 1);
        assert_eq!(m.source_failures(), 3);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_cache_hits();
        m.inc_cache_misses();
        m.inc_cache_errors();
        m.inc_fanouts();
        m.add_source_failures(1);
        m.reset();
        assert_eq!(m.cache_hits(), 0);
        assert_eq!(m.cache_misses(), 0);
        assert_eq!(m.cache_errors(), 0);
        assert_eq!(m.fanouts_launched(), 0);
        assert_eq!(m.source_failures(), 0);
    }
}
