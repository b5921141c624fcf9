//! Domain-level error taxonomy for Jenifesto.

use std::time::Duration;

/// Failures of the tier-1 entity lookup. Fatal to a page pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityFetchError {
    #[error("malformed entity id: {id:?}")]
    Malformed { id: String },

    #[error("entity lookup failed: {0}")]
    Upstream(String),

    #[error("entity {id} not found")]
    NotFound { id: String },

    #[error("invalid entity payload: {0}")]
    InvalidPayload(String),
}

/// Failures reported by a single source adapter. Always contained in the
/// aggregate's `failed` map, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}")]
    Status { status: u16 },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Jenifesto request-level errors.
#[derive(Debug, thiserror::Error)]
pub enum JenifestoError {
    #[error(transparent)]
    EntityFetch(#[from] EntityFetchError),

    #[error("No Q-ID available")]
    NoPrimaryId,

    #[error("No identifiers provided")]
    NoIdentifiers,

    #[error("No query provided")]
    EmptyQuery,

    #[error("storage error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<jenifesto_store::StoreError> for JenifestoError {
    fn from(err: jenifesto_store::StoreError) -> Self {
        JenifestoError::Store(err.to_string())
    }
}

/// Result type for Jenifesto operations.
pub type Result<T> = std::result::Result<T, JenifestoError>;
