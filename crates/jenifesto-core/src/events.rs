//! Push notifications from the pipeline to presentation observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::PrimaryEntity;
use crate::orchestrator::SecondaryResults;
use crate::session::PageRecord;

/// Events observers receive, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelEvent {
    PageUpdated { page: PageRecord },
    PrimaryEntityLoaded { entity: PrimaryEntity },
    SecondaryLoading,
    SecondaryLoaded { results: SecondaryResults },
    LoadError { message: String },
}

impl PanelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PanelEvent::PageUpdated { .. } => "PAGE_UPDATED",
            PanelEvent::PrimaryEntityLoaded { .. } => "PRIMARY_ENTITY_LOADED",
            PanelEvent::SecondaryLoading => "SECONDARY_LOADING",
            PanelEvent::SecondaryLoaded { .. } => "SECONDARY_LOADED",
            PanelEvent::LoadError { .. } => "LOAD_ERROR",
        }
    }
}

/// One-to-many event channel. Emitting with nobody listening is not an error.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<PanelEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.tx.subscribe()
    }

    /// Send `event` to every current subscriber; returns how many got it.
    pub fn emit(&self, event: PanelEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "event broadcast");
                receivers
            }
            Err(_) => {
                debug!(event = name, "no observers, event dropped");
                0
            }
        }
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
