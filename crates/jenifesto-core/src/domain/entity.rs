//! Primary entity records and the identifiers they carry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::error::EntityFetchError;
use crate::domain::source::SourceType;

fn entity_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Q[1-9][0-9]*$").expect("entity id pattern is valid"))
}

/// Canonical entity identifier (`Q` followed by a positive integer).
///
/// The inner field is private so every value has passed [`EntityId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Validate and wrap a raw identifier. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, EntityFetchError> {
        let trimmed = raw.trim();
        if entity_id_pattern().is_match(trimmed) {
            Ok(EntityId(trimmed.to_string()))
        } else {
            Err(EntityFetchError::Malformed {
                id: raw.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityFetchError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        EntityId::parse(&s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source-specific identifier attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// Registry key of the source this identifier belongs to
    #[serde(rename = "type")]
    pub kind: SourceType,
    /// The identifier itself (e.g. a VIAF cluster number)
    pub value: String,
    /// Human-readable property label (e.g. "VIAF ID")
    pub label: String,
    /// Deep link into the source, when one can be built
    #[serde(default)]
    pub url: Option<String>,
}

impl Identifier {
    pub fn new(kind: SourceType, value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            label: label.into(),
            url: None,
        }
    }

    /// An identifier is usable when it has a non-blank value.
    pub fn is_usable(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Identifiers keyed by the source they address.
pub type IdentifierMap = BTreeMap<SourceType, Identifier>;

/// The structured record retrieved at tier 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryEntity {
    pub id: EntityId,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub identifiers: IdentifierMap,
}

impl PrimaryEntity {
    /// Whether tier 2 has anything to query.
    pub fn has_usable_identifiers(&self) -> bool {
        self.identifiers.values().any(Identifier::is_usable)
    }
}
