//! Tag extraction for enriched records.

use crate::{normalize_tags, PatternTable, Record};
use std::collections::BTreeSet;

/// Derive up to [`crate::MAX_TAGS`] tags for `record`.
///
/// Candidates come from four independent sources:
/// 1. the base name of a single-token command (`/usr/bin/tar` → `tar`),
/// 2. the record's `language`,
/// 3. every tag-table label with at least one pattern matching
///    `"{title} {command} {description}"`,
/// 4. the record's category.
///
/// The candidate set is sorted and cut at the cap, so the surviving tags are
/// the lexicographically smallest ones rather than the most relevant.
pub fn extract_tags(record: &Record, table: &PatternTable) -> Vec<String> {
    let command = record.command.trim().to_lowercase();
    let text = format!(
        "{} {} {}",
        record.title.as_deref().unwrap_or_default(),
        command,
        record.description
    )
    .to_lowercase();

    let mut candidates: BTreeSet<String> = BTreeSet::new();

    if command.chars().count() > 1 && !command.chars().any(char::is_whitespace) {
        if let Some(base) = command.rsplit('/').next().filter(|b| !b.is_empty()) {
            candidates.insert(base.to_string());
        }
    }

    if let Some(language) = record.language.as_deref() {
        candidates.insert(language.to_string());
    }

    for (tag, patterns) in table.iter() {
        if patterns.iter().any(|p| p.is_match(&text)) {
            candidates.insert(tag.to_string());
        }
    }

    if !record.category.is_empty() {
        candidates.insert(record.category.clone());
    }

    normalize_tags(candidates)
}
