//! Launch-all / settle-each / join primitive shared by tiers 2 and 3.
//!
//! Every request runs on its own task and is joined regardless of what the
//! others do. A request that errors or panics settles as `Failed`; nothing
//! one source does can abort the call or cancel its siblings.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{AggregateResult, SourceError, SourceFailure, SourceType};

/// Deferred call into a source adapter. Invoked inside the spawned task so a
/// panic while building the future is isolated too.
pub type SourceCall<T> =
    Box<dyn FnOnce() -> BoxFuture<'static, Result<Option<T>, SourceError>> + Send>;

/// One queryable request of a fan-out.
pub struct PendingRequest<T> {
    pub source: SourceType,
    pub call: SourceCall<T>,
}

impl<T> PendingRequest<T> {
    pub fn new(source: SourceType, call: SourceCall<T>) -> Self {
        Self { source, call }
    }
}

/// How a single request settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<T> {
    Found(T),
    NotFound,
    Failed(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("source panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("source panicked: {s}")
    } else {
        "source panicked".to_string()
    }
}

/// Run every request concurrently and wait until all have settled.
///
/// The output has one entry per request, in input order.
pub async fn settle_all<T: Send + 'static>(
    requests: Vec<PendingRequest<T>>,
) -> Vec<(SourceType, Settlement<T>)> {
    let sources: Vec<SourceType> = requests.iter().map(|r| r.source).collect();
    let mut join_set = JoinSet::new();

    for (idx, request) in requests.into_iter().enumerate() {
        let call = request.call;
        join_set.spawn(async move {
            let outcome = AssertUnwindSafe(async move { call().await })
                .catch_unwind()
                .await;
            let settlement = match outcome {
                Ok(Ok(Some(value))) => Settlement::Found(value),
                Ok(Ok(None)) => Settlement::NotFound,
                Ok(Err(e)) => Settlement::Failed(e.to_string()),
                Err(payload) => Settlement::Failed(panic_message(payload.as_ref())),
            };
            (idx, settlement)
        });
    }

    let mut slots: Vec<Option<Settlement<T>>> = sources.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, settlement)) => slots[idx] = Some(settlement),
            Err(e) => warn!(error = %e, "fan-out task join error"),
        }
    }

    sources
        .into_iter()
        .zip(slots)
        .map(|(source, slot)| {
            let settlement = slot.unwrap_or_else(|| {
                Settlement::Failed(format!("request to {source} did not settle"))
            });
            (source, settlement)
        })
        .collect()
}

/// Fold settlements and skipped sources into an aggregate.
pub fn reduce<T>(
    skipped: Vec<SourceType>,
    settled: Vec<(SourceType, Settlement<T>)>,
) -> AggregateResult<T> {
    let mut aggregate = AggregateResult::new();
    for source in skipped {
        aggregate.record_skipped(source);
    }
    for (source, settlement) in settled {
        match settlement {
            Settlement::Found(value) => aggregate.record_success(source, value),
            Settlement::NotFound => {
                debug!(%source, "source reported not found");
                aggregate.record_failure(source, SourceFailure::not_found());
            }
            Settlement::Failed(message) => {
                debug!(%source, error = %message, "source request failed");
                aggregate.record_failure(source, SourceFailure::error(message));
            }
        }
    }
    aggregate
}
