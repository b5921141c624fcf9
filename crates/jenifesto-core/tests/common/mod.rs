//! Stub collaborators shared by the integration tests.
//!
//! Every stub counts its calls so tests can assert how many fan-outs
//! actually reached the sources.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jenifesto_core::{
    EntityFetchError, EntityFetcher, EntityId, Identifier, IdentifierMap, IdentifierSource,
    KeywordSource, ManualClock, OrchestratorConfig, PrimaryEntity, SourceError, SourceRegistry,
    SourceResult, SourceType, TieredOrchestrator, TtlCache,
};
use jenifesto_store::KvStore;

/// Fixed start time for manual clocks (2026-01-01T00:00:00Z).
pub const T0_MS: i64 = 1_767_225_600_000;

pub fn q(id: &str) -> EntityId {
    EntityId::parse(id).unwrap()
}

/// Entity with one identifier per `(source, value)` pair.
pub fn entity(id: &str, label: &str, identifiers: &[(SourceType, &str)]) -> PrimaryEntity {
    let identifiers: IdentifierMap = identifiers
        .iter()
        .map(|(source, value)| (*source, Identifier::new(*source, *value, format!("{source} ID"))))
        .collect();
    PrimaryEntity {
        id: q(id),
        label: label.to_string(),
        description: None,
        identifiers,
    }
}

// ---------------------------------------------------------------------------
// Entity fetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubEntityFetcher {
    entities: Mutex<HashMap<String, PrimaryEntity>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl StubEntityFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(self, entity: PrimaryEntity) -> Self {
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id.to_string(), entity);
        self
    }

    /// Make lookups of `id` take `delay` before answering.
    pub fn with_delay(self, id: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(id.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityFetcher for StubEntityFetcher {
    async fn fetch_entity(&self, id: &EntityId) -> Result<PrimaryEntity, EntityFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.entities
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| EntityFetchError::NotFound {
                id: id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// What a stub source does when called.
#[derive(Clone)]
pub enum Behavior {
    /// Answer with results titled after the query.
    Found,
    /// Reachable, nothing there.
    Empty,
    Fail(SourceError),
    Panic,
}

pub struct StubSource {
    name: &'static str,
    behavior: Behavior,
    /// Number of keyword hits to return
    hits: usize,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    in_flight: Option<Arc<InFlight>>,
}

impl StubSource {
    pub fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            hits: 3,
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            in_flight: None,
        }
    }

    pub fn found(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name, Behavior::Found))
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(
            name,
            Behavior::Fail(SourceError::Status { status: 503 }),
        ))
    }

    pub fn empty(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name, Behavior::Empty))
    }

    pub fn panicking(name: &'static str) -> Arc<Self> {
        Arc::new(Self::new(name, Behavior::Panic))
    }

    pub fn with_hits(mut self, hits: usize) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_delay(mut self, delay: Duration, in_flight: Arc<InFlight>) -> Self {
        self.delay = Some(delay);
        self.in_flight = Some(in_flight);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn result(&self, query: &str, n: usize) -> SourceResult {
        SourceResult::new(
            format!("{} #{n} for {query}", self.name),
            format!("https://{}.example/{query}/{n}", self.name),
        )
    }

    async fn enter(&self, query: &str) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(in_flight) = &self.in_flight {
            in_flight.enter();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(in_flight) = &self.in_flight {
            in_flight.exit();
        }
        match &self.behavior {
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Panic => panic!("{} adapter bug", self.name),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl IdentifierSource for StubSource {
    async fn fetch_by_identifier(&self, value: &str) -> Result<Option<SourceResult>, SourceError> {
        self.enter(value).await?;
        match self.behavior {
            Behavior::Empty => Ok(None),
            _ => Ok(Some(self.result(value, 0))),
        }
    }
}

#[async_trait]
impl KeywordSource for StubSource {
    async fn search_by_keyword(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<SourceResult>, SourceError> {
        self.enter(query).await?;
        match self.behavior {
            Behavior::Empty => Ok(vec![]),
            // Deliberately ignores `limit` so truncation is observable.
            _ => Ok((0..self.hits).map(|n| self.result(query, n)).collect()),
        }
    }
}

/// Tracks the highest number of concurrently running requests.
#[derive(Default)]
pub struct InFlight {
    now: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// All five sources registered for identifier lookup, keyword search on
/// OpenLibrary, Internet Archive and iNaturalist.
pub struct Sources {
    pub open_library: Arc<StubSource>,
    pub internet_archive: Arc<StubSource>,
    pub viaf: Arc<StubSource>,
    pub gbif: Arc<StubSource>,
    pub inaturalist: Arc<StubSource>,
}

impl Sources {
    pub fn all_found() -> Self {
        Self {
            open_library: StubSource::found("openlibrary"),
            internet_archive: StubSource::found("archive"),
            viaf: StubSource::found("viaf"),
            gbif: StubSource::found("gbif"),
            inaturalist: StubSource::found("inaturalist"),
        }
    }

    pub fn registry(&self) -> SourceRegistry {
        SourceRegistry::new()
            .with_identifier_source(SourceType::OpenLibrary, self.open_library.clone())
            .with_keyword_source(SourceType::OpenLibrary, self.open_library.clone())
            .with_identifier_source(SourceType::InternetArchive, self.internet_archive.clone())
            .with_keyword_source(SourceType::InternetArchive, self.internet_archive.clone())
            .with_identifier_source(SourceType::Viaf, self.viaf.clone())
            .with_identifier_source(SourceType::Gbif, self.gbif.clone())
            .with_identifier_source(SourceType::INaturalist, self.inaturalist.clone())
            .with_keyword_source(SourceType::INaturalist, self.inaturalist.clone())
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.open_library,
            &self.internet_archive,
            &self.viaf,
            &self.gbif,
            &self.inaturalist,
        ]
        .iter()
        .map(|s| s.calls())
        .sum()
    }
}

pub fn orchestrator(
    fetcher: Arc<StubEntityFetcher>,
    registry: SourceRegistry,
    store: Arc<dyn KvStore>,
    clock: Arc<ManualClock>,
) -> TieredOrchestrator {
    TieredOrchestrator::new(
        fetcher,
        registry,
        TtlCache::with_clock(store, clock),
        OrchestratorConfig::default(),
    )
}
