//! Identity-keyed reconciliation of record datasets.
//!
//! The primary dataset (normally the enriched one) defines the identities that
//! must survive. Secondary datasets (AI augmentation, extra sources) can only:
//! - replace `explanation` with a non-empty value,
//! - widen `tags` (sorted union, capped at [`crate::MAX_TAGS`]),
//! - append records whose identity the primary does not know.
//!
//! Tags leaving the reconciler are always normalized, whatever the source.
//!
//! Output order is primary insertion order followed by appended records in the
//! order they were seen. Callers and tests should compare by id rather than by
//! position.

use crate::{normalize_tags, Record};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Counters describing one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub primary_without_id: usize,
    pub primary_duplicates: usize,
    pub secondary_without_id: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub records: Vec<Record>,
    pub stats: ReconcileStats,
}

/// Incremental merge engine over one primary dataset.
#[derive(Debug)]
pub struct Reconciler {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    stats: ReconcileStats,
    now: DateTime<Utc>,
}

impl Reconciler {
    /// Index `primary` by id. Records without an id are dropped with a warning;
    /// a repeated id keeps its first position and takes the later value.
    /// Tags of every kept record are normalized.
    pub fn new(primary: Vec<Record>, now: DateTime<Utc>) -> Self {
        let mut records: Vec<Record> = Vec::with_capacity(primary.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(primary.len());
        let mut stats = ReconcileStats::default();

        for mut record in primary {
            if !record.has_id() {
                tracing::warn!(command = %record.command, "dropping primary record without id");
                stats.primary_without_id += 1;
                continue;
            }
            record.tags = normalize_tags(&record.tags);
            match index.get(&record.id) {
                Some(&slot) => {
                    stats.primary_duplicates += 1;
                    records[slot] = record;
                }
                None => {
                    index.insert(record.id.clone(), records.len());
                    records.push(record);
                }
            }
        }

        Self {
            records,
            index,
            stats,
            now,
        }
    }

    /// Fold one secondary dataset into the current state.
    pub fn merge(&mut self, secondary: Vec<Record>) {
        for mut incoming in secondary {
            if !incoming.has_id() {
                tracing::debug!(command = %incoming.command, "skipping secondary record without id");
                self.stats.secondary_without_id += 1;
                continue;
            }

            match self.index.get(&incoming.id) {
                Some(&slot) => {
                    if merge_fields(&mut self.records[slot], incoming, self.now) {
                        self.stats.updated += 1;
                    } else {
                        self.stats.unchanged += 1;
                    }
                }
                None => {
                    tracing::debug!(id = %incoming.id, "adding record unknown to primary dataset");
                    incoming.tags = normalize_tags(&incoming.tags);
                    self.index.insert(incoming.id.clone(), self.records.len());
                    self.records.push(incoming);
                    self.stats.inserted += 1;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Reconciliation {
        tracing::info!(
            records = self.records.len(),
            updated = self.stats.updated,
            inserted = self.stats.inserted,
            dropped = self.stats.primary_without_id,
            "reconciliation finished"
        );
        Reconciliation {
            records: self.records,
            stats: self.stats,
        }
    }
}

/// Merge `incoming` into `existing`; returns whether anything changed.
///
/// `updated_at` takes the incoming timestamp (or `now` when it has none) only
/// when a field actually changed, and never moves backwards.
fn merge_fields(existing: &mut Record, incoming: Record, now: DateTime<Utc>) -> bool {
    let mut changed = false;

    if let Some(explanation) = incoming.explanation.filter(|e| !e.trim().is_empty()) {
        if existing.explanation.as_deref() != Some(explanation.as_str()) {
            existing.explanation = Some(explanation);
            changed = true;
        }
    }

    if !incoming.tags.is_empty() {
        let merged = if existing.tags.is_empty() {
            normalize_tags(&incoming.tags)
        } else {
            normalize_tags(existing.tags.iter().chain(incoming.tags.iter()))
        };
        if merged != existing.tags {
            existing.tags = merged;
            changed = true;
        }
    }

    if changed {
        let stamp = incoming.updated_at.unwrap_or(now);
        existing.updated_at = Some(existing.updated_at.map_or(stamp, |prev| prev.max(stamp)));
    }
    changed
}

/// Merge `secondary` into `primary`.
pub fn reconcile(primary: Vec<Record>, secondary: Vec<Record>) -> Vec<Record> {
    let mut reconciler = Reconciler::new(primary, Utc::now());
    reconciler.merge(secondary);
    reconciler.finish().records
}

/// Merge every source in `sources` into `primary`, in order.
pub fn reconcile_all<I>(primary: Vec<Record>, sources: I, now: DateTime<Utc>) -> Reconciliation
where
    I: IntoIterator<Item = Vec<Record>>,
{
    let mut reconciler = Reconciler::new(primary, now);
    for source in sources {
        reconciler.merge(source);
    }
    reconciler.finish()
}
