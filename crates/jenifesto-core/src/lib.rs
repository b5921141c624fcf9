//! Jenifesto Core Library
//!
//! Tiered identity retrieval: a primary entity record (tier 1), a fan-out
//! over identifier-addressed sources (tier 2), and an on-demand keyword
//! search (tier 3), each fronted by a TTL cache. The [`MessageRouter`] is
//! the request/response and push surface observers talk to.

pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod fanout;
pub mod links;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod session;
pub mod source;
pub mod telemetry;

pub use domain::{
    AggregateResult, EntityFetchError, EntityId, FailureKind, Identifier, IdentifierMap,
    JenifestoError, Placement, PrimaryEntity, Result, SourceDisplay, SourceError, SourceFailure,
    SourceResult, SourceType,
};

pub use cache::{CacheKey, Clock, ManualClock, SystemClock, TtlCache};
pub use config::OrchestratorConfig;
pub use events::{EventBroadcaster, PanelEvent};
pub use fanout::{settle_all, PendingRequest, Settlement};
pub use links::identifier_url;
pub use metrics::METRICS;
pub use orchestrator::{SecondaryResults, TertiaryResults, TieredOrchestrator};
pub use registry::SourceRegistry;
pub use router::{MessageRouter, Request, Response};
pub use session::{PageRecord, PipelinePhase, SessionState, SessionStore};
pub use source::{EntityFetcher, IdentifierSource, KeywordSource};
pub use telemetry::init_tracing;

/// Version of the jenifesto-core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
