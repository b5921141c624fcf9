//! Per-source results and the aggregate a fan-out reduces to.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::source::{SourceDisplay, SourceType};

/// A single normalized hit from a source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Attached by the orchestrator after the fetch returns; adapters leave it empty.
    #[serde(default)]
    pub source_metadata: Option<SourceDisplay>,
}

impl SourceResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: None,
            thumbnail: None,
            source_metadata: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// Why a queried source produced no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source answered, but had nothing for this query.
    NotFound,
    /// The request errored (transport, status, parse, panic).
    Error,
}

/// Entry in an aggregate's `failed` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub const NOT_FOUND_MESSAGE: &'static str = "Not found";

    pub fn not_found() -> Self {
        Self {
            kind: FailureKind::NotFound,
            message: Self::NOT_FOUND_MESSAGE.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
        }
    }
}

/// Where a single source ended up in an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Successful,
    Failed,
    Skipped,
}

/// Reduced outcome of one fan-out.
///
/// Invariant: `successful`, `failed` and `skipped` are pairwise disjoint and
/// together cover every source considered for the call. The `record_*`
/// methods maintain this by moving a source out of any other bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult<T> {
    pub successful: BTreeMap<SourceType, T>,
    pub failed: BTreeMap<SourceType, SourceFailure>,
    pub skipped: Vec<SourceType>,
}

impl<T> Default for AggregateResult<T> {
    fn default() -> Self {
        Self {
            successful: BTreeMap::new(),
            failed: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> AggregateResult<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self, source: SourceType) {
        self.successful.remove(&source);
        self.failed.remove(&source);
        self.skipped.retain(|s| *s != source);
    }

    pub fn record_success(&mut self, source: SourceType, value: T) {
        self.clear(source);
        self.successful.insert(source, value);
    }

    pub fn record_failure(&mut self, source: SourceType, failure: SourceFailure) {
        self.clear(source);
        self.failed.insert(source, failure);
    }

    pub fn record_skipped(&mut self, source: SourceType) {
        self.clear(source);
        self.skipped.push(source);
        self.skipped.sort();
    }

    pub fn placement(&self, source: SourceType) -> Option<Placement> {
        if self.successful.contains_key(&source) {
            Some(Placement::Successful)
        } else if self.failed.contains_key(&source) {
            Some(Placement::Failed)
        } else if self.skipped.contains(&source) {
            Some(Placement::Skipped)
        } else {
            None
        }
    }

    /// Every source that appears in any bucket.
    pub fn considered(&self) -> BTreeSet<SourceType> {
        self.successful
            .keys()
            .chain(self.failed.keys())
            .chain(self.skipped.iter())
            .copied()
            .collect()
    }

    /// True when the buckets partition exactly `sources`.
    pub fn is_partition_of(&self, sources: &[SourceType]) -> bool {
        let expected: BTreeSet<SourceType> = sources.iter().copied().collect();
        let total = self.successful.len() + self.failed.len() + self.skipped.len();
        total == expected.len() && self.considered() == expected
    }

    /// Sources that produced data, in registry order.
    pub fn satisfied_sources(&self) -> Vec<SourceType> {
        self.successful.keys().copied().collect()
    }

    /// Apply `f` to every successful payload (used to attach display metadata).
    pub fn for_each_success(&mut self, mut f: impl FnMut(SourceType, &mut T)) {
        for (source, value) in self.successful.iter_mut() {
            f(*source, value);
        }
    }
}
