//! Process-wide session: the current page and how far its pipeline got.
//!
//! The state is versioned. Every navigation bumps the version and replaces
//! the page wholesale; writes that carry an older version are ignored, so a
//! pipeline that was overtaken by a newer navigation cannot clobber it.
//! Every accepted change is persisted under [`SESSION_KEY`].

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jenifesto_store::KvStore;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{EntityId, SourceType};

/// Store key of the persisted session.
pub const SESSION_KEY: &str = "session:current";

/// The page the viewer is currently on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub url: String,
    pub primary_id: Option<EntityId>,
    pub timestamp: DateTime<Utc>,
    pub navigation_id: Uuid,
}

/// Lifecycle of one page's retrieval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    #[default]
    NoPage,
    PrimaryLoading,
    PrimaryReady,
    SecondaryLoading,
    SecondaryReady,
    Error,
}

impl PipelinePhase {
    /// Forward edges of the lifecycle. Navigation resets the phase outside
    /// of this table.
    pub fn can_transition_to(self, next: PipelinePhase) -> bool {
        use PipelinePhase::*;
        matches!(
            (self, next),
            (NoPage, PrimaryLoading)
                | (NoPage, Error)
                | (PrimaryLoading, PrimaryReady)
                | (PrimaryLoading, Error)
                | (PrimaryReady, SecondaryLoading)
                | (SecondaryLoading, SecondaryReady)
                | (SecondaryLoading, Error)
        )
    }

    /// Phase to resume in when no pipeline is running: an interrupted load
    /// falls back to the last settled phase before it.
    pub fn settled(self) -> PipelinePhase {
        match self {
            PipelinePhase::PrimaryLoading => PipelinePhase::NoPage,
            PipelinePhase::SecondaryLoading => PipelinePhase::PrimaryReady,
            other => other,
        }
    }
}

/// Snapshot of the whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub page: Option<PageRecord>,
    /// Sources that answered at tier 2 for this page
    pub tier2_satisfied: BTreeSet<SourceType>,
    pub version: u64,
    pub phase: PipelinePhase,
}

/// Outcome of a navigation: the token later writes must present.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub version: u64,
    pub page: PageRecord,
}

/// Synchronized, persisted owner of [`SessionState`].
pub struct SessionStore {
    state: RwLock<SessionState>,
    store: Arc<dyn KvStore>,
}

impl SessionStore {
    /// Load the last persisted session, or start empty when there is none
    /// or it cannot be read.
    pub async fn restore(store: Arc<dyn KvStore>) -> Self {
        let state = match store.get(SESSION_KEY).await {
            Ok(Some(raw)) => match serde_json::from_value::<SessionState>(raw) {
                Ok(mut state) => {
                    let persisted = state.phase;
                    state.phase = persisted.settled();
                    info!(
                        version = state.version,
                        has_page = state.page.is_some(),
                        phase = ?state.phase,
                        interrupted = persisted != state.phase,
                        "session restored"
                    );
                    state
                }
                Err(e) => {
                    warn!(error = %e, "persisted session unreadable, starting empty");
                    SessionState::default()
                }
            },
            Ok(None) => SessionState::default(),
            Err(e) => {
                warn!(error = %e, "session store unavailable, starting empty");
                SessionState::default()
            }
        };

        Self {
            state: RwLock::new(state),
            store,
        }
    }

    /// Replace the page, reset tier-2 tracking, and start a new version.
    pub async fn navigate(
        &self,
        title: impl Into<String>,
        url: impl Into<String>,
        primary_id: Option<EntityId>,
    ) -> Navigation {
        let mut state = self.state.write().await;
        let page = PageRecord {
            title: title.into(),
            url: url.into(),
            primary_id,
            timestamp: Utc::now(),
            navigation_id: Uuid::new_v4(),
        };

        state.version += 1;
        state.page = Some(page.clone());
        state.tier2_satisfied.clear();
        state.phase = if page.primary_id.is_some() {
            PipelinePhase::PrimaryLoading
        } else {
            PipelinePhase::NoPage
        };

        self.persist(&state).await;
        Navigation {
            version: state.version,
            page,
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn current_page(&self) -> Option<PageRecord> {
        self.state.read().await.page.clone()
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    pub async fn is_current(&self, version: u64) -> bool {
        self.state.read().await.version == version
    }

    /// Sources tier 3 should leave out for the current page.
    pub async fn tier2_exclusions(&self) -> Vec<SourceType> {
        self.state.read().await.tier2_satisfied.iter().copied().collect()
    }

    /// Record which sources answered at tier 2. Ignored when `version` is
    /// no longer current.
    pub async fn mark_tier2_satisfied(&self, version: u64, sources: &[SourceType]) -> bool {
        let mut state = self.state.write().await;
        if state.version != version {
            debug!(version, current = state.version, "stale tier-2 update ignored");
            return false;
        }
        state.tier2_satisfied = sources.iter().copied().collect();
        self.persist(&state).await;
        true
    }

    /// Move the current pipeline to `next`. Returns false when `version` is
    /// stale or the lifecycle does not allow the edge.
    pub async fn advance(&self, version: u64, next: PipelinePhase) -> bool {
        let mut state = self.state.write().await;
        if state.version != version {
            debug!(version, current = state.version, phase = ?next, "stale phase change ignored");
            return false;
        }
        if !state.phase.can_transition_to(next) {
            warn!(from = ?state.phase, to = ?next, "rejected pipeline transition");
            return false;
        }
        state.phase = next;
        self.persist(&state).await;
        true
    }

    async fn persist(&self, state: &SessionState) {
        let value = match serde_json::to_value(state) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "session not serializable, skipping persist");
                return;
            }
        };
        if let Err(e) = self.store.set(SESSION_KEY, value).await {
            warn!(error = %e, "failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jenifesto_store::fakes::{MemoryKvStore, UnavailableKvStore};

    fn q(id: &str) -> Option<EntityId> {
        Some(EntityId::parse(id).unwrap())
    }

    #[test]
    fn test_lifecycle_edges() {
        use PipelinePhase::*;
        assert!(NoPage.can_transition_to(PrimaryLoading));
        assert!(NoPage.can_transition_to(Error));
        assert!(PrimaryLoading.can_transition_to(Error));
        assert!(SecondaryLoading.can_transition_to(Error));
        assert!(!PrimaryReady.can_transition_to(Error));
        assert!(!NoPage.can_transition_to(SecondaryLoading));
        assert!(!SecondaryReady.can_transition_to(PrimaryLoading));
    }

    #[tokio::test]
    async fn test_navigate_resets_and_versions() {
        let session = SessionStore::restore(Arc::new(MemoryKvStore::new())).await;

        let first = session.navigate("Douglas Adams", "https://en.wikipedia.org/wiki/Douglas_Adams", q("Q42")).await;
        assert!(session.mark_tier2_satisfied(first.version, &[SourceType::Viaf]).await);
        assert_eq!(session.tier2_exclusions().await, vec![SourceType::Viaf]);

        let second = session.navigate("Red fox", "https://en.wikipedia.org/wiki/Red_fox", q("Q8332")).await;
        assert!(second.version > first.version);
        assert!(session.tier2_exclusions().await.is_empty());
        assert_eq!(session.snapshot().await.phase, PipelinePhase::PrimaryLoading);
    }

    #[tokio::test]
    async fn test_page_without_id_has_no_pipeline() {
        let session = SessionStore::restore(Arc::new(MemoryKvStore::new())).await;
        let nav = session.navigate("Main Page", "https://en.wikipedia.org/", None).await;

        assert_eq!(session.snapshot().await.phase, PipelinePhase::NoPage);
        assert!(!session.advance(nav.version, PipelinePhase::PrimaryReady).await);
    }

    #[tokio::test]
    async fn test_stale_writes_are_ignored() {
        let session = SessionStore::restore(Arc::new(MemoryKvStore::new())).await;
        let old = session.navigate("A", "https://a", q("Q1")).await;
        let new = session.navigate("B", "https://b", q("Q2")).await;

        assert!(!session.advance(old.version, PipelinePhase::PrimaryReady).await);
        assert!(!session.mark_tier2_satisfied(old.version, &[SourceType::Gbif]).await);
        assert!(session.tier2_exclusions().await.is_empty());

        assert!(session.advance(new.version, PipelinePhase::PrimaryReady).await);
        assert!(session.is_current(new.version).await);
    }

    #[tokio::test]
    async fn test_restore_round_trips_through_store() {
        let store = Arc::new(MemoryKvStore::new());
        let session = SessionStore::restore(store.clone()).await;
        let nav = session.navigate("Douglas Adams", "https://en.wikipedia.org/wiki/Douglas_Adams", q("Q42")).await;
        session.mark_tier2_satisfied(nav.version, &[SourceType::OpenLibrary]).await;
        drop(session);

        let reopened = SessionStore::restore(store).await;
        let state = reopened.snapshot().await;
        assert_eq!(state.page, Some(nav.page));
        assert_eq!(state.version, nav.version);
        assert_eq!(reopened.tier2_exclusions().await, vec![SourceType::OpenLibrary]);
    }

    #[tokio::test]
    async fn test_restore_settles_interrupted_loads() {
        let store = Arc::new(MemoryKvStore::new());
        let session = SessionStore::restore(store.clone()).await;
        let nav = session.navigate("Douglas Adams", "https://en.wikipedia.org/wiki/Douglas_Adams", q("Q42")).await;
        drop(session);

        // Process died during tier 1.
        let reopened = SessionStore::restore(store.clone()).await;
        assert_eq!(reopened.snapshot().await.phase, PipelinePhase::NoPage);
        assert_eq!(reopened.current_page().await, Some(nav.page.clone()));
        drop(reopened);

        // Process died during tier 2.
        let session = SessionStore::restore(store.clone()).await;
        let nav = session.navigate("Red fox", "https://en.wikipedia.org/wiki/Red_fox", q("Q8332")).await;
        assert!(session.advance(nav.version, PipelinePhase::PrimaryReady).await);
        assert!(session.advance(nav.version, PipelinePhase::SecondaryLoading).await);
        drop(session);

        let reopened = SessionStore::restore(store).await;
        let state = reopened.snapshot().await;
        assert_eq!(state.phase, PipelinePhase::PrimaryReady);
        assert_eq!(state.version, nav.version);
    }

    #[test]
    fn test_settled_keeps_resting_phases() {
        use PipelinePhase::*;
        assert_eq!(PrimaryLoading.settled(), NoPage);
        assert_eq!(SecondaryLoading.settled(), PrimaryReady);
        for phase in [NoPage, PrimaryReady, SecondaryReady, Error] {
            assert_eq!(phase.settled(), phase);
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_keeps_session_in_memory() {
        let session = SessionStore::restore(Arc::new(UnavailableKvStore::new())).await;
        assert_eq!(session.snapshot().await, SessionState::default());

        session.navigate("A", "https://a", q("Q1")).await;
        assert_eq!(session.current_page().await.map(|p| p.title), Some("A".to_string()));
    }
}
