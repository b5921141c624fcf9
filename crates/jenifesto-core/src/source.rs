//! Collaborator seams: the entity lookup and the per-source adapters.
//!
//! Implementations live outside this crate (HTTP clients, fixtures, test
//! stubs). Adapters are responsible for their own timeouts; the
//! orchestrator only reacts to settlement.

use async_trait::async_trait;

use crate::domain::{EntityFetchError, EntityId, PrimaryEntity, SourceError, SourceResult};

/// Tier-1 lookup of the structured entity record.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    /// Fetch the entity for `id`. Identifier URLs may be left empty; the
    /// orchestrator fills them in.
    async fn fetch_entity(&self, id: &EntityId) -> Result<PrimaryEntity, EntityFetchError>;
}

/// Tier-2 lookup of a single record by its source-specific identifier.
#[async_trait]
pub trait IdentifierSource: Send + Sync {
    /// `Ok(None)` means the source was reached and has no such record.
    async fn fetch_by_identifier(&self, value: &str) -> Result<Option<SourceResult>, SourceError>;
}

/// Tier-3 free-text search.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    /// Return at most `limit` hits for `query`.
    async fn search_by_keyword(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SourceResult>, SourceError>;
}
