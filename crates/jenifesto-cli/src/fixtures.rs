//! Fixture-backed collaborators.
//!
//! A catalog file stands in for the live entity service and the five
//! source APIs so the pipeline can be driven offline. A source marked
//! `"fail": true` errors on every call, which is how outages are simulated.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use jenifesto_core::{
    EntityFetchError, EntityFetcher, EntityId, IdentifierSource, KeywordSource, PrimaryEntity,
    SourceError, SourceRegistry, SourceResult, SourceType,
};

/// Catalog bundled with the binary, used when `--fixtures` is not given.
const BUILTIN_CATALOG: &str = include_str!("../fixtures/catalog.json");

/// Canned responses for one source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceFixture {
    /// Every call fails with `SourceError::Unavailable`
    #[serde(default)]
    pub fail: bool,
    /// Identifier value -> record
    #[serde(default)]
    pub records: BTreeMap<String, SourceResult>,
    /// Searchable records; absent means the source has no keyword search
    #[serde(default)]
    pub search: Option<Vec<SourceResult>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixtureCatalog {
    #[serde(default)]
    pub entities: BTreeMap<String, PrimaryEntity>,
    #[serde(default)]
    pub sources: BTreeMap<SourceType, SourceFixture>,
}

impl FixtureCatalog {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Invalid fixture catalog")
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture catalog {:?}", path))?;
        Self::from_json(&raw)
    }

    /// Split into the entity fetcher and a registry of fixture sources.
    pub fn into_collaborators(self) -> (Arc<dyn EntityFetcher>, SourceRegistry) {
        let fetcher: Arc<dyn EntityFetcher> = Arc::new(FixtureEntities {
            entities: self.entities,
        });

        let mut registry = SourceRegistry::new();
        for (source, fixture) in self.sources {
            let keyword = fixture.search.is_some();
            let adapter = Arc::new(FixtureSource { source, fixture });
            registry = registry.with_identifier_source(source, adapter.clone());
            if keyword {
                registry = registry.with_keyword_source(source, adapter);
            }
        }
        (fetcher, registry)
    }
}

struct FixtureEntities {
    entities: BTreeMap<String, PrimaryEntity>,
}

#[async_trait]
impl EntityFetcher for FixtureEntities {
    async fn fetch_entity(&self, id: &EntityId) -> Result<PrimaryEntity, EntityFetchError> {
        self.entities
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| EntityFetchError::NotFound { id: id.to_string() })
    }
}

struct FixtureSource {
    source: SourceType,
    fixture: SourceFixture,
}

impl FixtureSource {
    fn check_up(&self) -> Result<(), SourceError> {
        if self.fixture.fail {
            Err(SourceError::Unavailable(format!(
                "{} fixture is marked as failing",
                self.source
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentifierSource for FixtureSource {
    async fn fetch_by_identifier(&self, value: &str) -> Result<Option<SourceResult>, SourceError> {
        self.check_up()?;
        Ok(self.fixture.records.get(value).cloned())
    }
}

#[async_trait]
impl KeywordSource for FixtureSource {
    async fn search_by_keyword(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SourceResult>, SourceError> {
        self.check_up()?;
        let needle = query.to_lowercase();
        let matches = |r: &SourceResult| {
            r.title.to_lowercase().contains(&needle)
                || r
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        };
        Ok(self
            .fixture
            .search
            .iter()
            .flatten()
            .filter(|r| matches(r))
            .take(limit)
            .cloned()
            .collect())
    }
}
