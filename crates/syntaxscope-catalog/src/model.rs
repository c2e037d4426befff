//! Catalog record types.
//!
//! `RawEntry` is what a corpus producer hands to the enrichment stage;
//! `Record` is the canonical catalog entry that every later stage reads and writes.
//! Both deserialize leniently (missing strings become empty, missing lists become
//! empty) so that foreign or partially written JSON can still be merged.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Upper bound on tags carried by a record.
pub const MAX_TAGS: usize = 5;

/// Category assigned when no classification pattern matches.
pub const OTHER_CATEGORY: &str = "other";

/// A usage sample attached to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Provenance of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub license: String,
}

/// One catalogued command-reference entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Empty when the serialized form had no id.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Shell namespace the entry was documented under (`bash`, `powershell`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(id: impl Into<String>, command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            description: description.into(),
            category: String::new(),
            tags: Vec::new(),
            examples: Vec::new(),
            explanation: None,
            title: None,
            language: None,
            source: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn has_explanation(&self) -> bool {
        self.explanation
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty())
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// An entry as produced by a corpus source, before enrichment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Trim, lowercase, deduplicate, sort ascending and cap at [`MAX_TAGS`].
///
/// Truncation happens after sorting, so which tags survive a cap is decided by
/// lexicographic order, not by relevance.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(MAX_TAGS)
        .collect()
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.filter(|s| !s.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_tags_dedupes_case_insensitively_and_caps() {
        let tags = normalize_tags(["Search", "search ", "FILE", "a", "b", "c", "d"]);
        assert_eq!(tags, vec!["a", "b", "c", "d", "file"]);
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: Record = serde_json::from_str(r#"{"command": "ls"}"#).unwrap();
        assert_eq!(record.command, "ls");
        assert!(!record.has_id());
        assert!(record.description.is_empty());
        assert!(record.tags.is_empty());
        assert!(!record.has_explanation());
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let record: Record = serde_json::from_str(
            r#"{"id": "abc", "created_at": "2024-03-01T12:30:00.250000", "updated_at": null}"#,
        )
        .unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(record.created_at, Some(expected));
        assert_eq!(record.updated_at, None);
    }

    #[test]
    fn whitespace_explanation_counts_as_missing() {
        let mut record = Record::new("x", "ls", "");
        record.explanation = Some("   ".to_string());
        assert!(!record.has_explanation());
    }
}
