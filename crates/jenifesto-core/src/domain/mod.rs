//! Domain models for Jenifesto.
//!
//! Canonical definitions for the core entities:
//! - `SourceType` / `SourceDisplay`: the five secondary sources
//! - `PrimaryEntity` / `Identifier`: the tier-1 record and its identifiers
//! - `SourceResult` / `AggregateResult`: what a fan-out reduces to

pub mod entity;
pub mod error;
pub mod result;
pub mod source;

// Re-export main types and errors
pub use entity::{EntityId, Identifier, IdentifierMap, PrimaryEntity};
pub use error::{EntityFetchError, JenifestoError, Result, SourceError};
pub use result::{AggregateResult, FailureKind, Placement, SourceFailure, SourceResult};
pub use source::{SourceDisplay, SourceType};
