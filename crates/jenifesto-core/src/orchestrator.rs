//! Tiered query orchestration.
//!
//! [`TieredOrchestrator`] owns the three tier operations. Each one checks the
//! TTL cache, and on a miss runs its collaborators, reduces, and stores the
//! outcome as a unit:
//!
//! - tier 1: [`TieredOrchestrator::fetch_primary_entity`]
//! - tier 2: [`TieredOrchestrator::fetch_secondary_results`], fan-out by identifier
//! - tier 3: [`TieredOrchestrator::search_tertiary`], fan-out by keyword

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{instrument, Instrument};

use crate::cache::{CacheKey, TtlCache};
use crate::config::OrchestratorConfig;
use crate::domain::{
    AggregateResult, EntityFetchError, EntityId, IdentifierMap, JenifestoError, PrimaryEntity,
    Result, SourceError, SourceResult, SourceType,
};
use crate::fanout::{reduce, settle_all, PendingRequest};
use crate::links::identifier_url;
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::SourceRegistry;
use crate::source::EntityFetcher;

/// Aggregate produced by tier 2: one record per successful source.
pub type SecondaryResults = AggregateResult<SourceResult>;

/// Aggregate produced by tier 3: a bounded list per successful source.
pub type TertiaryResults = AggregateResult<Vec<SourceResult>>;

/// Cache-fronted entry points for every retrieval tier.
#[derive(Clone)]
pub struct TieredOrchestrator {
    entity_fetcher: Arc<dyn EntityFetcher>,
    registry: Arc<SourceRegistry>,
    cache: TtlCache,
    config: OrchestratorConfig,
}

impl TieredOrchestrator {
    pub fn new(
        entity_fetcher: Arc<dyn EntityFetcher>,
        registry: SourceRegistry,
        cache: TtlCache,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            entity_fetcher,
            registry: Arc::new(registry),
            cache,
            config,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Tier 1: the structured record for `id`, with deep links attached.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn fetch_primary_entity(&self, id: &EntityId) -> Result<PrimaryEntity> {
        let key = CacheKey::primary(id);
        if let Some(entity) = self.cache.get::<PrimaryEntity>(&key).await {
            METRICS.inc_cache_hits();
            obs::emit_cache_hit(key.tier(), id.as_str());
            return Ok(entity);
        }
        METRICS.inc_cache_misses();
        obs::emit_cache_miss(key.tier(), id.as_str());

        let fetched = self.entity_fetcher.fetch_entity(id).await?;
        let entity = prepare_entity(id, fetched)?;

        self.cache.set(&key, &entity, self.config.entity_ttl()).await;
        Ok(entity)
    }

    /// Tier 2: query every registered source the entity has an identifier
    /// for. Sources without a usable identifier are skipped.
    pub async fn fetch_secondary_results(
        &self,
        id: &EntityId,
        identifiers: &IdentifierMap,
    ) -> SecondaryResults {
        let key = CacheKey::secondary(id);
        async {
            if let Some(results) = self.cache.get::<SecondaryResults>(&key).await {
                METRICS.inc_cache_hits();
                obs::emit_cache_hit(key.tier(), id.as_str());
                return results;
            }
            METRICS.inc_cache_misses();
            obs::emit_cache_miss(key.tier(), id.as_str());

            let mut skipped = Vec::new();
            let mut requests: Vec<PendingRequest<SourceResult>> = Vec::new();
            for (source, fetcher) in self.registry.identifier_sources() {
                match identifiers.get(&source).filter(|i| i.is_usable()) {
                    Some(identifier) => {
                        let value = identifier.value.trim().to_string();
                        requests.push(PendingRequest::new(
                            source,
                            Box::new(move || {
                                async move { fetcher.fetch_by_identifier(&value).await }.boxed()
                            }),
                        ));
                    }
                    None => skipped.push(source),
                }
            }

            let mut results = self.run_fanout(key.tier(), skipped, requests).await;
            let registry = &self.registry;
            results.for_each_success(|source, result| {
                result.source_metadata = Some(registry.display(source));
            });

            self.cache
                .set(&key, &results, self.config.secondary_ttl())
                .await;
            results
        }
        .instrument(obs::tier_span(key.tier(), id.as_str()))
        .await
    }

    /// Tier 3: keyword search across keyword-capable sources not in
    /// `excluded`. Each success holds at most `limit` results.
    pub async fn search_tertiary(
        &self,
        keyword: &str,
        excluded: &[SourceType],
        limit: usize,
    ) -> Result<TertiaryResults> {
        let query = keyword.trim();
        if query.is_empty() {
            return Err(JenifestoError::EmptyQuery);
        }

        let key = CacheKey::tertiary(query, excluded, limit);
        let results = async {
            if let Some(results) = self.cache.get::<TertiaryResults>(&key).await {
                METRICS.inc_cache_hits();
                obs::emit_cache_hit(key.tier(), query);
                return results;
            }
            METRICS.inc_cache_misses();
            obs::emit_cache_miss(key.tier(), query);

            let mut skipped = Vec::new();
            let mut requests: Vec<PendingRequest<Vec<SourceResult>>> = Vec::new();
            for (source, searcher) in self.registry.keyword_sources() {
                if excluded.contains(&source) {
                    skipped.push(source);
                    continue;
                }
                let query = query.to_string();
                requests.push(PendingRequest::new(
                    source,
                    Box::new(move || {
                        async move {
                            let mut hits = searcher.search_by_keyword(&query, limit).await?;
                            hits.truncate(limit);
                            Ok::<_, SourceError>((!hits.is_empty()).then_some(hits))
                        }
                        .boxed()
                    }),
                ));
            }

            let mut results = self.run_fanout(key.tier(), skipped, requests).await;
            let registry = &self.registry;
            results.for_each_success(|source, hits| {
                let display = registry.display(source);
                for hit in hits.iter_mut() {
                    hit.source_metadata = Some(display.clone());
                }
            });

            self.cache.set(&key, &results, self.config.search_ttl()).await;
            results
        }
        .instrument(obs::tier_span(key.tier(), query))
        .await;

        Ok(results)
    }

    async fn run_fanout<T: Send + 'static>(
        &self,
        tier: &str,
        skipped: Vec<SourceType>,
        requests: Vec<PendingRequest<T>>,
    ) -> AggregateResult<T> {
        let launched = requests.len();
        let started = Instant::now();
        METRICS.inc_fanouts();

        let settled = settle_all(requests).await;
        let results = reduce(skipped, settled);

        METRICS.add_source_failures(results.failed.len() as u64);
        obs::emit_fanout_settled(
            tier,
            launched,
            results.successful.len(),
            results.failed.len(),
            results.skipped.len(),
            started.elapsed().as_millis() as u64,
        );
        results
    }
}

/// Check a fetched entity against the request and fill in deep links.
///
/// Blank identifiers are dropped; an identifier filed under the wrong
/// source key makes the whole payload invalid.
fn prepare_entity(
    requested: &EntityId,
    mut entity: PrimaryEntity,
) -> std::result::Result<PrimaryEntity, EntityFetchError> {
    if &entity.id != requested {
        return Err(EntityFetchError::InvalidPayload(format!(
            "requested {requested}, received {}",
            entity.id
        )));
    }

    if let Some((key, ident)) = entity.identifiers.iter().find(|(k, i)| **k != i.kind) {
        return Err(EntityFetchError::InvalidPayload(format!(
            "identifier of type {} filed under {key}",
            ident.kind
        )));
    }

    entity.identifiers.retain(|_, ident| ident.is_usable());
    for (source, ident) in entity.identifiers.iter_mut() {
        ident.value = ident.value.trim().to_string();
        if let Some(url) = identifier_url(*source, &ident.value) {
            ident.url = Some(url);
        }
    }

    Ok(entity)
}
