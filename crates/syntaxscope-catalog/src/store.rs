//! JSON persistence for stage snapshots.
//!
//! Reads are lenient: a missing or unreadable file is an empty dataset, and a
//! single bad element never poisons the rest. Writes go to a temporary sibling
//! and are renamed into place.

use crate::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize data for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a JSON array of `T` from `path`.
///
/// Missing file: warning, empty. Unreadable file, invalid JSON or a top-level
/// value that is not an array: error log, empty. Elements that do not decode
/// as `T` are skipped with a warning.
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "file not found, using empty dataset");
        return Vec::new();
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to read file");
            return Vec::new();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "invalid JSON");
            return Vec::new();
        }
    };

    let serde_json::Value::Array(items) = value else {
        tracing::error!(path = %path.display(), "expected a JSON array at top level");
        return Vec::new();
    };

    let total = items.len();
    let out: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(path = %path.display(), index = i, error = %err, "skipping undecodable element");
                None
            }
        })
        .collect();

    tracing::debug!(path = %path.display(), loaded = out.len(), total, "loaded JSON array");
    out
}

/// Write `items` as a pretty-printed JSON array.
pub fn save_json<T: Serialize>(items: &[T], path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    let tmp = tmp_path(path);
    fs::write(&tmp, json).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), items = items.len(), "saved JSON");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Receives intermediate snapshots from long-running stages.
pub trait CheckpointSink {
    fn checkpoint(&mut self, records: &[Record]) -> Result<(), StoreError>;
}

/// Checkpoints by rewriting one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    writes: usize,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful checkpoints so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl CheckpointSink for JsonFileSink {
    fn checkpoint(&mut self, records: &[Record]) -> Result<(), StoreError> {
        save_json(records, &self.path)?;
        self.writes += 1;
        Ok(())
    }
}

/// In-memory sink keeping every snapshot; useful for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub snapshots: Vec<Vec<Record>>,
}

impl CheckpointSink for MemorySink {
    fn checkpoint(&mut self, records: &[Record]) -> Result<(), StoreError> {
        self.snapshots.push(records.to_vec());
        Ok(())
    }
}
