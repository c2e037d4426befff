//! Dataset statistics logged at the end of every stage.

use crate::{RawEntry, Record};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub with_explanation: usize,
    pub with_tags: usize,
    /// `(category, count)`, most frequent first, ties by name.
    pub categories: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn from_records(records: &[Record]) -> Self {
        Self::tally(records.iter().map(|r| {
            (r.category.as_str(), r.has_explanation(), r.has_tags())
        }))
    }

    /// Summary of corpus output; the category is the parse-time guess.
    pub fn from_raw_entries(entries: &[RawEntry]) -> Self {
        Self::tally(entries.iter().map(|e| {
            let explained = e.explanation.as_deref().is_some_and(|x| !x.trim().is_empty());
            (e.category.as_deref().unwrap_or_default(), explained, !e.tags.is_empty())
        }))
    }

    /// `(category, has_explanation, has_tags)` per item.
    fn tally<'a>(items: impl Iterator<Item = (&'a str, bool, bool)>) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0;
        let mut with_explanation = 0;
        let mut with_tags = 0;

        for (category, explained, tagged) in items {
            total += 1;
            let category = if category.is_empty() { "unknown" } else { category };
            *counts.entry(category).or_default() += 1;
            if explained {
                with_explanation += 1;
            }
            if tagged {
                with_tags += 1;
            }
        }

        Self {
            total,
            with_explanation,
            with_tags,
            categories: breakdown(counts),
        }
    }

    pub fn log(&self, label: &str) {
        tracing::info!(
            stage = label,
            total = self.total,
            with_explanation = self.with_explanation,
            with_tags = self.with_tags,
            "dataset summary"
        );
        for (category, count) in &self.categories {
            tracing::info!(stage = label, category = %category, count, "category breakdown");
        }
    }
}

/// Sort `(key, count)` pairs by descending count, then key.
pub fn breakdown<K: AsRef<str>>(counts: HashMap<K, usize>) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.as_ref().to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}
