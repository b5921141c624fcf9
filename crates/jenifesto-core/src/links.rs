//! Deep links from identifier values into each source's web UI.

use crate::domain::SourceType;

/// Build the browsable URL for `value` in `source`, or `None` when the
/// value cannot be linked (blank, or an OpenLibrary id of unknown kind).
pub fn identifier_url(source: SourceType, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match source {
        SourceType::OpenLibrary => openlibrary_path(value)
            .map(|path| format!("https://openlibrary.org/{path}/{value}")),
        SourceType::InternetArchive => Some(format!("https://archive.org/details/{value}")),
        SourceType::Viaf => Some(format!("https://viaf.org/viaf/{value}")),
        SourceType::Gbif => Some(format!("https://www.gbif.org/species/{value}")),
        SourceType::INaturalist => Some(format!("https://www.inaturalist.org/taxa/{value}")),
    }
}

/// OpenLibrary ids end in a kind letter: A (author), W (work), M (edition).
fn openlibrary_path(olid: &str) -> Option<&'static str> {
    match olid.chars().last()? {
        'A' => Some("authors"),
        'W' => Some("works"),
        'M' => Some("books"),
        _ => None,
    }
}
