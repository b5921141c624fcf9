//! Source identities and their display metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the external data providers reachable from an entity's
/// identifiers. Doubles as the identifier type key.
///
/// The derived `Ord` follows declaration order and is what exclusion sets
/// are sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "openlibrary")]
    OpenLibrary,
    #[serde(rename = "internet_archive")]
    InternetArchive,
    #[serde(rename = "viaf")]
    Viaf,
    #[serde(rename = "gbif")]
    Gbif,
    #[serde(rename = "inaturalist")]
    INaturalist,
}

impl SourceType {
    /// Every known source, in registry order.
    pub const ALL: [SourceType; 5] = [
        SourceType::OpenLibrary,
        SourceType::InternetArchive,
        SourceType::Viaf,
        SourceType::Gbif,
        SourceType::INaturalist,
    ];

    /// Wire key, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::OpenLibrary => "openlibrary",
            SourceType::InternetArchive => "internet_archive",
            SourceType::Viaf => "viaf",
            SourceType::Gbif => "gbif",
            SourceType::INaturalist => "inaturalist",
        }
    }

    /// Display metadata for this source.
    pub fn display(&self) -> SourceDisplay {
        let (name, color, icon) = match self {
            SourceType::OpenLibrary => (
                "OpenLibrary",
                "#418541",
                "https://openlibrary.org/favicon.ico",
            ),
            SourceType::InternetArchive => (
                "Internet Archive",
                "#6b8cae",
                "https://archive.org/favicon.ico",
            ),
            SourceType::Viaf => ("VIAF", "#8b6b4e", "https://viaf.org/viaf/images/viaf.ico"),
            SourceType::Gbif => ("GBIF", "#4e9a47", "https://www.gbif.org/favicon.ico"),
            SourceType::INaturalist => (
                "iNaturalist",
                "#74ac00",
                "https://www.inaturalist.org/favicon.ico",
            ),
        };
        SourceDisplay {
            name: name.to_string(),
            color: color.to_string(),
            icon: Some(icon.to_string()),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown source type: {s}"))
    }
}

/// How a source is presented next to its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDisplay {
    /// Human-readable name
    pub name: String,
    /// Accent color (CSS hex)
    pub color: String,
    /// Favicon URL
    pub icon: Option<String>,
}
