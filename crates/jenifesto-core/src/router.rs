//! Typed request/response surface and the page pipeline.
//!
//! Every inbound message is a [`Request`] variant and is answered by exactly
//! one [`Response`]. Errors never escape `handle`; they become
//! `Response::Error`. Navigation additionally drives the tier 1 -> tier 2
//! pipeline and broadcasts [`PanelEvent`]s as it goes.

use std::sync::Arc;

use jenifesto_store::KvStore;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::{EntityId, IdentifierMap, JenifestoError, PrimaryEntity, Result};
use crate::events::{EventBroadcaster, PanelEvent};
use crate::obs;
use crate::orchestrator::{SecondaryResults, TertiaryResults, TieredOrchestrator};
use crate::session::{PageRecord, PipelinePhase, SessionStore};

/// Inbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// The viewer opened a page. Runs the whole page pipeline.
    PageLoaded {
        title: String,
        url: String,
        #[serde(default)]
        primary_id: Option<String>,
    },
    GetCurrentPage,
    GetPrimaryEntity,
    GetSecondaryResults {
        #[serde(default)]
        identifiers: Option<IdentifierMap>,
    },
    SearchTertiary {
        #[serde(default)]
        query: String,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::PageLoaded { .. } => "PAGE_LOADED",
            Request::GetCurrentPage => "GET_CURRENT_PAGE",
            Request::GetPrimaryEntity => "GET_PRIMARY_ENTITY",
            Request::GetSecondaryResults { .. } => "GET_SECONDARY_RESULTS",
            Request::SearchTertiary { .. } => "SEARCH_TERTIARY",
        }
    }
}

/// Replies, serialized without a tag: `{success}`, `{page}`, `{data}`,
/// `{results}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack { success: bool },
    CurrentPage { page: Option<PageRecord> },
    PrimaryEntity { data: PrimaryEntity },
    Secondary { results: SecondaryResults },
    Tertiary { results: TertiaryResults },
    Error { error: String },
}

impl Response {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            error: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Dispatches requests against the orchestrator and the session.
pub struct MessageRouter {
    orchestrator: TieredOrchestrator,
    session: SessionStore,
    events: EventBroadcaster,
}

impl MessageRouter {
    /// Build a router, restoring the last session from `store`.
    pub async fn build(orchestrator: TieredOrchestrator, store: Arc<dyn KvStore>) -> Self {
        let session = SessionStore::restore(store).await;
        let events = EventBroadcaster::new(orchestrator.config().event_capacity());
        Self {
            orchestrator,
            session,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn orchestrator(&self) -> &TieredOrchestrator {
        &self.orchestrator
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!(request = request.name(), "handling request");
        match request {
            Request::PageLoaded {
                title,
                url,
                primary_id,
            } => {
                self.page_loaded(title, url, primary_id).await;
                Response::Ack { success: true }
            }
            Request::GetCurrentPage => Response::CurrentPage {
                page: self.session.current_page().await,
            },
            Request::GetPrimaryEntity => match self.primary_entity().await {
                Ok(data) => Response::PrimaryEntity { data },
                Err(e) => Response::error(e),
            },
            Request::GetSecondaryResults { identifiers } => {
                match self.secondary_results(identifiers).await {
                    Ok(results) => Response::Secondary { results },
                    Err(e) => Response::error(e),
                }
            }
            Request::SearchTertiary { query } => match self.search(&query).await {
                Ok(results) => Response::Tertiary { results },
                Err(e) => Response::error(e),
            },
        }
    }

    /// Navigation entry point: record the page, then tier 1, then tier 2
    /// when the entity has something to look up.
    ///
    /// Each step first checks that its navigation is still current; once a
    /// newer page has been loaded this pipeline neither writes session state
    /// nor broadcasts.
    async fn page_loaded(&self, title: String, url: String, primary_id: Option<String>) {
        let raw_id = primary_id.filter(|raw| !raw.trim().is_empty());
        let (primary_id, malformed) = match raw_id.as_deref().map(EntityId::parse) {
            Some(Ok(id)) => (Some(id), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        let nav = self.session.navigate(title, url, primary_id.clone()).await;
        obs::emit_page_navigated(
            &nav.page.title,
            primary_id.as_ref().map(EntityId::as_str),
            nav.version,
        );
        self.events.emit(PanelEvent::PageUpdated {
            page: nav.page.clone(),
        });

        if let Some(err) = malformed {
            if self.session.advance(nav.version, PipelinePhase::Error).await {
                obs::emit_pipeline_error(raw_id.as_deref().unwrap_or_default(), &err);
                self.events.emit(PanelEvent::LoadError {
                    message: err.to_string(),
                });
            }
            return;
        }
        let Some(id) = primary_id else {
            debug!("page has no primary id, nothing to load");
            return;
        };

        let entity = match self.orchestrator.fetch_primary_entity(&id).await {
            Ok(entity) => entity,
            Err(e) => {
                if self.session.advance(nav.version, PipelinePhase::Error).await {
                    obs::emit_pipeline_error(id.as_str(), &e);
                    self.events.emit(PanelEvent::LoadError {
                        message: e.to_string(),
                    });
                }
                return;
            }
        };

        if !self
            .session
            .advance(nav.version, PipelinePhase::PrimaryReady)
            .await
        {
            return;
        }
        self.events.emit(PanelEvent::PrimaryEntityLoaded {
            entity: entity.clone(),
        });

        if !entity.has_usable_identifiers() {
            info!(id = %id, "entity carries no usable identifiers, tier 2 not started");
            return;
        }
        if !self
            .session
            .advance(nav.version, PipelinePhase::SecondaryLoading)
            .await
        {
            return;
        }
        self.events.emit(PanelEvent::SecondaryLoading);

        let results = self
            .orchestrator
            .fetch_secondary_results(&id, &entity.identifiers)
            .await;

        if !self
            .session
            .mark_tier2_satisfied(nav.version, &results.satisfied_sources())
            .await
        {
            return;
        }
        if self
            .session
            .advance(nav.version, PipelinePhase::SecondaryReady)
            .await
        {
            self.events.emit(PanelEvent::SecondaryLoaded { results });
        }
    }

    async fn current_primary_id(&self) -> Result<EntityId> {
        self.session
            .current_page()
            .await
            .and_then(|page| page.primary_id)
            .ok_or(JenifestoError::NoPrimaryId)
    }

    async fn primary_entity(&self) -> Result<PrimaryEntity> {
        let id = self.current_primary_id().await?;
        self.orchestrator.fetch_primary_entity(&id).await
    }

    async fn secondary_results(&self, identifiers: Option<IdentifierMap>) -> Result<SecondaryResults> {
        let identifiers = identifiers.ok_or(JenifestoError::NoIdentifiers)?;
        let version = self.session.version().await;
        let id = self.current_primary_id().await?;

        let results = self
            .orchestrator
            .fetch_secondary_results(&id, &identifiers)
            .await;
        self.session
            .mark_tier2_satisfied(version, &results.satisfied_sources())
            .await;
        Ok(results)
    }

    async fn search(&self, query: &str) -> Result<TertiaryResults> {
        if query.trim().is_empty() {
            return Err(JenifestoError::EmptyQuery);
        }
        let excluded = self.session.tier2_exclusions().await;
        let limit = self.orchestrator.config().search_limit;
        self.orchestrator.search_tertiary(query, &excluded, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req: Request = serde_json::from_value(serde_json::json!({
            "type": "PAGE_LOADED",
            "title": "Douglas Adams",
            "url": "https://en.wikipedia.org/wiki/Douglas_Adams",
            "primary_id": "Q42"
        }))
        .unwrap();
        assert_eq!(req.name(), "PAGE_LOADED");

        let req: Request =
            serde_json::from_value(serde_json::json!({"type": "GET_SECONDARY_RESULTS"})).unwrap();
        assert_eq!(req, Request::GetSecondaryResults { identifiers: None });

        let req: Request =
            serde_json::from_value(serde_json::json!({"type": "SEARCH_TERTIARY"})).unwrap();
        assert_eq!(
            req,
            Request::SearchTertiary {
                query: String::new()
            }
        );
    }

    #[test]
    fn test_response_wire_shape() {
        let json = serde_json::to_value(Response::Ack { success: true }).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));

        let json = serde_json::to_value(Response::CurrentPage { page: None }).unwrap();
        assert_eq!(json, serde_json::json!({"page": null}));

        let json = serde_json::to_value(Response::error(JenifestoError::NoPrimaryId)).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No Q-ID available"}));
    }
}
