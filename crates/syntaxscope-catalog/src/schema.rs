//! Draft-7 schema validation of published datasets.
//!
//! The schema file describes a single record; datasets are validated as an
//! array of it. Validation results are advisory: callers log them and decide.

use jsonschema::{Draft, JSONSchema};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const EMBEDDED_SCHEMA: &str = include_str!("../schema/command_record.schema.json");

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to compile schema: {0}")]
    Compile(String),
}

pub struct SchemaValidator {
    record_schema: Value,
    compiled: JSONSchema,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("record_schema", &self.record_schema)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Load the record schema from `schema_path`, or the embedded one.
    pub fn new(schema_path: Option<&Path>) -> Result<Self, SchemaError> {
        let record_schema: Value = match schema_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&content)?
            }
            None => serde_json::from_str(EMBEDDED_SCHEMA)?,
        };
        Self::from_value(record_schema)
    }

    pub fn from_value(record_schema: Value) -> Result<Self, SchemaError> {
        let array_schema = serde_json::json!({
            "type": "array",
            "items": record_schema,
        });
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&array_schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self {
            record_schema,
            compiled,
        })
    }

    pub fn record_schema(&self) -> &Value {
        &self.record_schema
    }

    /// Validate `items` as one array; each error reads `"{message} at {path}"`.
    pub fn validate<T: Serialize>(&self, items: &[T]) -> Result<(), Vec<String>> {
        let instance = serde_json::to_value(items).map_err(|e| vec![e.to_string()])?;
        self.validate_value(&instance)
    }

    pub fn validate_value(&self, instance: &Value) -> Result<(), Vec<String>> {
        if let Err(errors) = self.compiled.validate(instance) {
            return Err(errors
                .map(|e| format!("{} at {}", e, e.instance_path))
                .collect());
        }
        Ok(())
    }

    /// Validate and log the outcome under `label`.
    pub fn is_valid<T: Serialize>(&self, label: &str, items: &[T]) -> bool {
        match self.validate(items) {
            Ok(()) => {
                tracing::debug!(dataset = label, items = items.len(), "schema validation passed");
                true
            }
            Err(errors) => {
                tracing::warn!(dataset = label, errors = errors.len(), "schema validation failed");
                for error in errors.iter().take(20) {
                    tracing::warn!(dataset = label, "{error}");
                }
                false
            }
        }
    }
}
