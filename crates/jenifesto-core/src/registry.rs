//! Source registry: which sources exist, how to query them, how to show them.
//!
//! The registry is assembled once at startup and never mutated afterwards.
//! A source may support identifier lookup, keyword search, or both.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{SourceDisplay, SourceType};
use crate::source::{IdentifierSource, KeywordSource};

/// Capabilities and display metadata for one source.
#[derive(Clone)]
pub struct RegistryEntry {
    pub source: SourceType,
    pub display: SourceDisplay,
    pub by_identifier: Option<Arc<dyn IdentifierSource>>,
    pub by_keyword: Option<Arc<dyn KeywordSource>>,
}

impl RegistryEntry {
    fn new(source: SourceType) -> Self {
        Self {
            source,
            display: source.display(),
            by_identifier: None,
            by_keyword: None,
        }
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("source", &self.source)
            .field("display", &self.display)
            .field("by_identifier", &self.by_identifier.is_some())
            .field("by_keyword", &self.by_keyword.is_some())
            .finish()
    }
}

/// Static table of source type -> capabilities + display metadata.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: BTreeMap<SourceType, RegistryEntry>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_mut(&mut self, source: SourceType) -> &mut RegistryEntry {
        self.entries
            .entry(source)
            .or_insert_with(|| RegistryEntry::new(source))
    }

    /// Register the identifier-lookup capability for `source`.
    pub fn with_identifier_source(
        mut self,
        source: SourceType,
        fetcher: Arc<dyn IdentifierSource>,
    ) -> Self {
        self.entry_mut(source).by_identifier = Some(fetcher);
        self
    }

    /// Register the keyword-search capability for `source`.
    pub fn with_keyword_source(mut self, source: SourceType, searcher: Arc<dyn KeywordSource>) -> Self {
        self.entry_mut(source).by_keyword = Some(searcher);
        self
    }

    /// Override the built-in display metadata for `source`.
    pub fn with_display(mut self, source: SourceType, display: SourceDisplay) -> Self {
        self.entry_mut(source).display = display;
        self
    }

    /// Sources that can be queried by identifier, in registry order.
    pub fn identifier_sources(&self) -> Vec<(SourceType, Arc<dyn IdentifierSource>)> {
        self.entries
            .values()
            .filter_map(|e| e.by_identifier.clone().map(|f| (e.source, f)))
            .collect()
    }

    /// Sources that can be searched by keyword, in registry order.
    pub fn keyword_sources(&self) -> Vec<(SourceType, Arc<dyn KeywordSource>)> {
        self.entries
            .values()
            .filter_map(|e| e.by_keyword.clone().map(|s| (e.source, s)))
            .collect()
    }

    pub fn supports_keyword(&self, source: SourceType) -> bool {
        self.entries
            .get(&source)
            .is_some_and(|e| e.by_keyword.is_some())
    }

    /// Display metadata for `source`, falling back to the built-in table.
    pub fn display(&self, source: SourceType) -> SourceDisplay {
        self.entries
            .get(&source)
            .map(|e| e.display.clone())
            .unwrap_or_else(|| source.display())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
