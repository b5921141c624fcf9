//! Structured observability hooks for the retrieval pipeline.
//!
//! This module provides:
//! - Tier-scoped tracing spans via [`tier_span`]
//! - Emission functions for cache lookups, fan-out settlement, navigation
//!   and pipeline failures
//!
//! Events are emitted at `info!`/`debug!` level; filter with `RUST_LOG`.

use tracing::{debug, info, Span};

/// Span covering one tier call. Attach it with `Instrument::instrument` so
/// the span follows the future across await points.
///
/// ```ignore
/// fetch.instrument(tier_span("tier2", "Q42")).await
/// // all tracing calls inside carry tier = "tier2", query = "Q42"
/// ```
pub fn tier_span(tier: &str, query: &str) -> Span {
    tracing::info_span!("jenifesto.tier", tier = %tier, query = %query)
}

/// Emit event: cached value served.
pub fn emit_cache_hit(tier: &str, query: &str) {
    debug!(event = "tier.cache_hit", tier = %tier, query = %query);
}

/// Emit event: nothing fresh cached, going to the collaborators.
pub fn emit_cache_miss(tier: &str, query: &str) {
    debug!(event = "tier.cache_miss", tier = %tier, query = %query);
}

/// Emit event: every launched request of a fan-out has settled.
pub fn emit_fanout_settled(
    tier: &str,
    launched: usize,
    successful: usize,
    failed: usize,
    skipped: usize,
    duration_ms: u64,
) {
    info!(
        event = "tier.fanout_settled",
        tier = %tier,
        launched = launched,
        successful = successful,
        failed = failed,
        skipped = skipped,
        duration_ms = duration_ms,
    );
}

/// Emit event: the viewer navigated to a new page.
pub fn emit_page_navigated(title: &str, primary_id: Option<&str>, version: u64) {
    info!(
        event = "page.navigated",
        title = %title,
        primary_id = primary_id.unwrap_or("-"),
        version = version,
    );
}

/// Emit event: the page pipeline stopped on a user-visible error (warning level).
pub fn emit_pipeline_error(primary_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "pipeline.error", primary_id = %primary_id, error = %error);
}
