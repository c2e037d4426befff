//! Stage functions and the end-to-end pipeline run.
//!
//! Stages, in order:
//! 1. scrape: corpus → raw entries (fatal on error)
//! 2. enrich: raw entries → enriched records (fatal)
//! 3. augment: optional; an unreachable or failing generator degrades to no
//!    augmentation
//! 4. combine: reconcile enriched + AI + extra sources, validate (warning only),
//!    save (fatal)
//! 5. export: copy the combined dataset to the public location (fatal)

use crate::config::PipelineConfig;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use syntaxscope_catalog::{
    enrich, load_json_array, reconcile_all, save_json, DatasetSummary, JsonFileSink, RawEntry,
    Record, Rules, SchemaValidator,
};
use syntaxscope_corpus::{ensure_corpus, scrape_pages, FetchOutcome};
use syntaxscope_llm::{sample_entries, AugmentReport, Augmentor, TextGenerator};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Parse the existing corpus checkout without cloning or pulling.
    pub skip_fetch: bool,
    pub skip_ai: bool,
    /// Use the built-in sample entries instead of the corpus.
    pub sample: bool,
    /// Additional record datasets folded into the combine stage, in order.
    pub extra_sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AiStatus {
    Skipped,
    Unavailable { reason: String },
    Completed { report: AugmentReport },
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub raw: usize,
    pub enriched: usize,
    pub ai: AiStatus,
    pub combined: DatasetSummary,
    pub schema_valid: bool,
    pub export_path: PathBuf,
    pub elapsed: Duration,
}

/// Stage 1: fetch (unless skipped) and parse the corpus, or take the sample.
pub fn scrape_stage(
    config: &PipelineConfig,
    skip_fetch: bool,
    sample: bool,
    now: DateTime<Utc>,
) -> Result<Vec<RawEntry>> {
    let entries = if sample {
        tracing::info!("using built-in sample entries");
        sample_entries()
    } else {
        if skip_fetch {
            tracing::info!("skipping corpus fetch");
        } else {
            let outcome = ensure_corpus(&config.corpus_url, &config.clone_dir())
                .context("failed to fetch corpus")?;
            if outcome == FetchOutcome::Stale {
                tracing::warn!("continuing with a stale corpus checkout");
            }
        }
        let report = scrape_pages(&config.pages_dir(), config.workers, now)
            .context("failed to scrape corpus pages")?;
        report.entries
    };

    save_json(&entries, &config.raw_path()).context("failed to save raw entries")?;
    DatasetSummary::from_raw_entries(&entries).log("scraped");
    Ok(entries)
}

/// Stage 2: classify, tag and identify raw entries.
pub fn enrich_stage(
    config: &PipelineConfig,
    entries: Vec<RawEntry>,
    now: DateTime<Utc>,
) -> Result<Vec<Record>> {
    let rules = Rules::load_or_builtin(config.rules_path()).context("failed to load rules")?;
    let records = enrich(entries, &rules, now);
    save_json(&records, &config.enriched_path()).context("failed to save enriched records")?;
    Ok(records)
}

/// Stage 3: augment with the generator, checkpointing into the AI dataset.
///
/// Never fails the run: an unreachable generator or a failed final save is
/// logged and reported as [`AiStatus::Unavailable`].
pub fn augment_stage(
    config: &PipelineConfig,
    records: Vec<Record>,
    generator: &dyn TextGenerator,
) -> (Vec<Record>, AiStatus) {
    let mut sink = JsonFileSink::new(config.ai_path());
    let outcome = match Augmentor::new(generator, config.augment.clone()).run(records, &mut sink) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "augmentation unavailable, continuing without it");
            return (
                Vec::new(),
                AiStatus::Unavailable {
                    reason: err.to_string(),
                },
            );
        }
    };

    if let Err(err) = save_json(&outcome.records, &config.ai_path()) {
        tracing::error!(error = %err, "failed to save augmented records");
    }
    DatasetSummary::from_records(&outcome.records).log("augmented");
    (
        outcome.records,
        AiStatus::Completed {
            report: outcome.report,
        },
    )
}

/// Load every extra source; a missing file is an empty source.
pub fn load_extra_sources(paths: &[PathBuf]) -> Vec<Vec<Record>> {
    paths
        .iter()
        .map(|path| {
            let records: Vec<Record> = load_json_array(path);
            tracing::info!(path = %path.display(), records = records.len(), "loaded extra source");
            records
        })
        .collect()
}

/// Stage 4: reconcile, validate and save the combined dataset.
///
/// Returns the combined records and whether they passed schema validation.
pub fn combine_stage(
    config: &PipelineConfig,
    enriched: Vec<Record>,
    ai: Vec<Record>,
    extra: Vec<Vec<Record>>,
    now: DateTime<Utc>,
) -> Result<(Vec<Record>, bool)> {
    let sources = std::iter::once(ai).chain(extra);
    let combined = reconcile_all(enriched, sources, now).records;

    let validator = SchemaValidator::new(config.schema_file.as_deref())
        .context("failed to load record schema")?;
    let valid = validator.is_valid("combined", &combined);
    if !valid {
        tracing::warn!("combined data does not fully conform to the schema");
    }

    save_json(&combined, &config.combined_path()).context("failed to save combined dataset")?;
    DatasetSummary::from_records(&combined).log("combined");
    Ok((combined, valid))
}

/// Stage 5: publish the combined dataset.
pub fn export_stage(config: &PipelineConfig) -> Result<usize> {
    let source = config.combined_path();
    if !source.exists() {
        return Err(anyhow!("combined dataset not found at {}", source.display()));
    }
    let records: Vec<Record> = load_json_array(&source);
    save_json(&records, &config.export_path()).context("failed to export dataset")?;
    DatasetSummary::from_records(&records).log("exported");
    Ok(records.len())
}

/// Validation result for one published file.
#[derive(Debug, Clone)]
pub struct FileValidation {
    pub path: PathBuf,
    pub errors: Vec<String>,
}

impl FileValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate the combined and exported files against the record schema.
pub fn validate_files(config: &PipelineConfig) -> Result<Vec<FileValidation>> {
    let validator = SchemaValidator::new(config.schema_file.as_deref())
        .context("failed to load record schema")?;

    let mut out = Vec::new();
    for path in [config.combined_path(), config.export_path()] {
        let errors = validate_file(&validator, &path);
        out.push(FileValidation { path, errors });
    }
    Ok(out)
}

fn validate_file(validator: &SchemaValidator, path: &Path) -> Vec<String> {
    if !path.exists() {
        return vec![format!("file not found: {}", path.display())];
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => return vec![format!("failed to read {}: {err}", path.display())],
    };
    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => return vec![format!("invalid JSON: {err}")],
    };
    if value.as_array().is_some_and(|a| a.is_empty()) {
        return vec!["file contains no records".to_string()];
    }
    validator.validate_value(&value).err().unwrap_or_default()
}

/// Run every stage in order.
pub fn run_pipeline(
    config: &PipelineConfig,
    options: &RunOptions,
    generator: Option<&dyn TextGenerator>,
) -> Result<PipelineReport> {
    let started = Instant::now();
    let now = Utc::now();
    let run_id = now.format("%Y%m%dT%H%M%SZ").to_string();
    let span = tracing::info_span!("pipeline", run_id = %run_id);
    let _guard = span.enter();

    tracing::info!("starting pipeline");

    tracing::info!("step 1: scraping corpus");
    let raw = scrape_stage(config, options.skip_fetch, options.sample, now)
        .context("step 1 (scrape) failed")?;
    let raw_count = raw.len();

    tracing::info!("step 2: enriching entries");
    let enriched = enrich_stage(config, raw, now).context("step 2 (enrich) failed")?;
    let enriched_count = enriched.len();

    let (ai_records, ai) = match generator {
        Some(generator) if !options.skip_ai => {
            tracing::info!(backend = %generator.describe(), "step 3: augmenting with AI");
            augment_stage(config, enriched.clone(), generator)
        }
        _ => {
            tracing::info!("step 3: skipping AI augmentation");
            (Vec::new(), AiStatus::Skipped)
        }
    };

    tracing::info!("step 4: combining sources");
    let extra = load_extra_sources(&options.extra_sources);
    let (combined, schema_valid) = combine_stage(config, enriched, ai_records, extra, now)
        .context("step 4 (combine) failed")?;

    tracing::info!("step 5: exporting");
    export_stage(config).context("step 5 (export) failed")?;

    let elapsed = started.elapsed();
    tracing::info!(
        elapsed_ms = elapsed.as_millis() as u64,
        output = %config.export_path().display(),
        "pipeline completed"
    );

    Ok(PipelineReport {
        run_id,
        raw: raw_count,
        enriched: enriched_count,
        ai,
        combined: DatasetSummary::from_records(&combined),
        schema_valid,
        export_path: config.export_path(),
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use syntaxscope_llm::{GenerateError, RetryPolicy};

    struct Canned {
        alive: bool,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(alive: bool) -> Self {
            Self {
                alive,
                calls: Cell::new(0),
            }
        }
    }

    impl TextGenerator for Canned {
        fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.calls.set(self.calls.get() + 1);
            if prompt.contains("JSON array") {
                Ok(r#"["search", "text"]"#.to_string())
            } else {
                Ok("Searches for text.".to_string())
            }
        }

        fn probe(&self) -> Result<(), GenerateError> {
            if self.alive {
                Ok(())
            } else {
                Err(GenerateError::Transport {
                    endpoint: "canned".into(),
                    message: "connection refused".into(),
                })
            }
        }

        fn describe(&self) -> String {
            "canned".to_string()
        }
    }

    fn config(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig {
            data_dir: root.join("data"),
            public_dir: root.join("public"),
            log_to_file: false,
            ..Default::default()
        };
        config.augment.retry = RetryPolicy::immediate(3);
        config.augment.pacing = Duration::ZERO;
        config
    }

    fn write_page(config: &PipelineConfig, rel: &str, body: &str) {
        let path = config.pages_dir().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn full_run_over_local_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_page(
            &config,
            "common/grep.md",
            "# grep\n\n> Find patterns in files using regular expressions.\n\n- Search for a pattern within a file:\n\n`grep \"{{search_pattern}}\" {{path/to/file}}`\n",
        );
        write_page(
            &config,
            "common/curl.md",
            "# curl\n\n> Transfers data from or to a server.\n> Supports most protocols, including HTTP.\n",
        );

        let generator = Canned::new(true);
        let options = RunOptions {
            skip_fetch: true,
            ..Default::default()
        };
        let report = run_pipeline(&config, &options, Some(&generator)).unwrap();

        assert_eq!(report.raw, 2);
        assert_eq!(report.enriched, 2);
        assert_eq!(report.combined.total, 2);
        assert_eq!(report.combined.with_explanation, 2);
        assert!(report.schema_valid);
        assert!(matches!(report.ai, AiStatus::Completed { .. }));
        // Enriched records already carry tags, so only explanations are asked for.
        assert_eq!(generator.calls.get(), 2);

        let exported: Vec<Record> = load_json_array(&config.export_path());
        assert_eq!(exported.len(), 2);
        let grep = exported.iter().find(|r| r.command == "grep").unwrap();
        assert_eq!(grep.category, "file-management");
        assert_eq!(grep.explanation.as_deref(), Some("Searches for text."));
        assert!(config.ai_path().exists());
        assert!(config.raw_path().exists());
    }

    #[test]
    fn unreachable_generator_degrades_to_no_augmentation() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let generator = Canned::new(false);
        let options = RunOptions {
            sample: true,
            ..Default::default()
        };

        let report = run_pipeline(&config, &options, Some(&generator)).unwrap();

        assert!(matches!(report.ai, AiStatus::Unavailable { .. }));
        assert_eq!(report.combined.total, 3);
        assert_eq!(report.combined.with_explanation, 0);
        assert_eq!(generator.calls.get(), 0);
    }

    #[test]
    fn missing_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let options = RunOptions {
            skip_fetch: true,
            skip_ai: true,
            ..Default::default()
        };
        assert!(run_pipeline(&config, &options, None).is_err());
        assert!(!config.export_path().exists());
    }

    #[test]
    fn extra_sources_are_folded_in() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let extra_path = dir.path().join("extra.json");
        let mut extra = Record::new("manual-1", "jq", "Process JSON");
        extra.category = "text-processing".to_string();
        extra.tags = vec!["json".to_string()];
        save_json(&[extra], &extra_path).unwrap();

        let options = RunOptions {
            sample: true,
            skip_ai: true,
            extra_sources: vec![extra_path],
            ..Default::default()
        };
        let report = run_pipeline(&config, &options, None).unwrap();
        assert_eq!(report.combined.total, 4);
        assert!(matches!(report.ai, AiStatus::Skipped));
    }

    #[test]
    fn validate_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        save_json(&[Record::new("", "ls", "")], &config.combined_path()).unwrap();

        let results = validate_files(&config).unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_valid());
        assert!(results[1].errors[0].starts_with("file not found"));
    }

    #[test]
    fn export_without_combined_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_stage(&config(dir.path())).is_err());
    }
}
