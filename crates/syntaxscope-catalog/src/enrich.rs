//! Enrichment stage: raw corpus entries → canonical records.

use crate::{
    assign_id, category_key, classify, extract_tags, DatasetSummary, RawEntry, Record, Rules,
};
use chrono::{DateTime, Utc};

/// Enrich one raw entry.
///
/// The category is always recomputed and the tags always re-extracted from it.
/// An existing id is kept; otherwise one is derived from `"{command}-{category}"`.
/// `created_at` is only set when missing, `updated_at` is set to `now`.
///
/// `now` is supplied by the caller so runs can be reproduced in tests.
pub fn enrich_entry(entry: RawEntry, rules: &Rules, now: DateTime<Utc>) -> Record {
    let category = classify(&entry.command, &entry.description, &rules.categories);

    let mut record = Record {
        id: entry.id.unwrap_or_default(),
        command: entry.command,
        description: entry.description,
        category,
        tags: Vec::new(),
        examples: entry.examples,
        explanation: entry.explanation,
        title: entry.title,
        language: entry.language,
        source: entry.source,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    };

    record.tags = extract_tags(&record, &rules.tags);

    if !record.has_id() {
        record.id = assign_id(&category_key(&record.command, &record.category));
    }

    if record.created_at.is_none() {
        record.created_at = Some(now);
    }
    record.updated_at = Some(now);

    record
}

/// Enrich a whole raw dataset and log a summary of the result.
pub fn enrich(entries: Vec<RawEntry>, rules: &Rules, now: DateTime<Utc>) -> Vec<Record> {
    tracing::info!(entries = entries.len(), "enriching entries");

    let records: Vec<Record> = entries
        .into_iter()
        .map(|entry| enrich_entry(entry, rules, now))
        .collect();

    DatasetSummary::from_records(&records).log("enriched");
    records
}
