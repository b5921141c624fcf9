//! Observability tests for the retrieval pipeline.
//!
//! These tests verify that structured tracing events are emitted for cache
//! lookups, fan-out settlement, navigation and pipeline failures.

mod common;

use std::sync::Arc;

use common::*;
use jenifesto_core::obs::{
    emit_cache_hit, emit_fanout_settled, emit_page_navigated, emit_pipeline_error, tier_span,
};
use jenifesto_core::{ManualClock, MessageRouter, Request, SourceType};
use jenifesto_store::fakes::MemoryKvStore;
use jenifesto_store::KvStore;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_fanout_settled_logs_counts() {
    emit_fanout_settled("tier2", 3, 2, 1, 2, 15);
    assert!(logs_contain("tier.fanout_settled"));
    assert!(logs_contain("successful=2"));
}

#[traced_test]
#[test]
fn test_emit_page_navigated_without_id() {
    emit_page_navigated("Main Page", None, 7);
    assert!(logs_contain("page.navigated"));
    assert!(logs_contain("version=7"));
}

#[traced_test]
#[test]
fn test_emit_pipeline_error_logs_warning() {
    emit_pipeline_error("Q404", &"entity Q404 not found");
    assert!(logs_contain("pipeline.error"));
    assert!(logs_contain("WARN"));
}

#[traced_test]
#[test]
fn test_tier_span_wraps_events() {
    let _entered = tier_span("tier3", "red fox").entered();
    emit_cache_hit("tier3", "red fox");
    assert!(logs_contain("jenifesto.tier"));
}

#[traced_test]
#[tokio::test]
async fn test_pipeline_emits_lifecycle_events() {
    let fetcher = Arc::new(StubEntityFetcher::new().with_entity(entity(
        "Q42",
        "Douglas Adams",
        &[(SourceType::Viaf, "113230702")],
    )));
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let orch = orchestrator(
        fetcher,
        Sources::all_found().registry(),
        store.clone(),
        Arc::new(ManualClock::new(T0_MS)),
    );
    let router = MessageRouter::build(orch, store).await;

    router
        .handle(Request::PageLoaded {
            title: "Douglas Adams".to_string(),
            url: "https://en.wikipedia.org/wiki/Douglas_Adams".to_string(),
            primary_id: Some("Q42".to_string()),
        })
        .await;

    assert!(logs_contain("page.navigated"));
    assert!(logs_contain("tier.cache_miss"));
    assert!(logs_contain("tier.fanout_settled"));
}
