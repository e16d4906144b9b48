//! Display helpers for source attribution.

use std::collections::HashSet;

/// Sources with duplicates removed, first occurrence kept.
///
/// Presentation only; `Answer::sources` itself keeps every entry.
pub fn unique_sources(sources: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .map(String::as_str)
        .filter(|source| seen.insert(*source))
        .collect()
}
