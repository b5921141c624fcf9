//! Orchestrator tuning: cache lifetimes, search limit, event channel size.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const DAY_SECS: u64 = 24 * 60 * 60;
const HOUR_SECS: u64 = 60 * 60;

/// Settings shared by every tier.
///
/// Loaded from defaults, environment variables, or a TOML file; missing
/// fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Lifetime of a cached primary entity
    pub entity_ttl_secs: u64,
    /// Lifetime of a cached tier-2 aggregate
    pub secondary_ttl_secs: u64,
    /// Lifetime of a cached tier-3 aggregate
    pub search_ttl_secs: u64,
    /// Per-source cap on keyword results
    pub search_limit: usize,
    /// Buffered events per subscriber before slow ones start lagging
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            entity_ttl_secs: DAY_SECS,
            secondary_ttl_secs: HOUR_SECS,
            search_ttl_secs: HOUR_SECS,
            search_limit: 5,
            event_capacity: 64,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(var = name, value = %raw, "unparsable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl OrchestratorConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - JENIFESTO_ENTITY_TTL_SECS (default: 86400)
    /// - JENIFESTO_SECONDARY_TTL_SECS (default: 3600)
    /// - JENIFESTO_SEARCH_TTL_SECS (default: 3600)
    /// - JENIFESTO_SEARCH_LIMIT (default: 5)
    /// - JENIFESTO_EVENT_CAPACITY (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            entity_ttl_secs: env_or("JENIFESTO_ENTITY_TTL_SECS", defaults.entity_ttl_secs),
            secondary_ttl_secs: env_or(
                "JENIFESTO_SECONDARY_TTL_SECS",
                defaults.secondary_ttl_secs,
            ),
            search_ttl_secs: env_or("JENIFESTO_SEARCH_TTL_SECS", defaults.search_ttl_secs),
            search_limit: env_or("JENIFESTO_SEARCH_LIMIT", defaults.search_limit),
            event_capacity: env_or("JENIFESTO_EVENT_CAPACITY", defaults.event_capacity),
        }
    }

    pub fn entity_ttl(&self) -> Duration {
        Duration::from_secs(self.entity_ttl_secs)
    }

    pub fn secondary_ttl(&self) -> Duration {
        Duration::from_secs(self.secondary_ttl_secs)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    /// Event channel capacity, never zero.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.entity_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.secondary_ttl(), Duration::from_secs(3_600));
        assert_eq!(cfg.search_ttl(), Duration::from_secs(3_600));
        assert_eq!(cfg.search_limit, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: OrchestratorConfig = toml::from_str("search_limit = 10\n").unwrap();
        assert_eq!(cfg.search_limit, 10);
        assert_eq!(cfg.entity_ttl_secs, 86_400);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cfg = OrchestratorConfig {
            event_capacity: 0,
            ..OrchestratorConfig::default()
        };
        assert_eq!(cfg.event_capacity(), 1);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        // Unique name so parallel tests never race on it.
        std::env::set_var("JENIFESTO_TEST_ENV_OR_GARBAGE", "not-a-number");
        assert_eq!(env_or("JENIFESTO_TEST_ENV_OR_GARBAGE", 7u64), 7);
        std::env::set_var("JENIFESTO_TEST_ENV_OR_GARBAGE", " 12 ");
        assert_eq!(env_or("JENIFESTO_TEST_ENV_OR_GARBAGE", 7u64), 12);
        std::env::remove_var("JENIFESTO_TEST_ENV_OR_GARBAGE");
        assert_eq!(env_or("JENIFESTO_TEST_ENV_OR_GARBAGE", 7u64), 7);
    }
}
