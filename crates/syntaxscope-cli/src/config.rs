//! Pipeline configuration: defaults, then environment, then CLI flags.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use syntaxscope_corpus::{DEFAULT_WORKERS, TLDR_REPO_URL};
use syntaxscope_llm::{normalize_ollama_host, AugmentConfig, DEFAULT_OLLAMA_HOST, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT};

pub const DEFAULT_DATA_DIR: &str = "data_pipeline/data";
pub const DEFAULT_PUBLIC_DIR: &str = "public/data";
pub const EXPORT_FILE: &str = "syntax.json";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub public_dir: PathBuf,
    pub corpus_url: String,
    pub workers: usize,
    pub rules_file: Option<PathBuf>,
    pub schema_file: Option<PathBuf>,
    pub ollama_host: String,
    pub ollama_model: String,
    pub ollama_timeout: Duration,
    pub augment: AugmentConfig,
    /// Mirror logs into `<data_dir>/logs/pipeline.log`.
    pub log_to_file: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            corpus_url: TLDR_REPO_URL.to_string(),
            workers: DEFAULT_WORKERS,
            rules_file: None,
            schema_file: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            ollama_timeout: DEFAULT_TIMEOUT,
            augment: AugmentConfig::default(),
            log_to_file: true,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SYNTAXSCOPE_DATA_DIR`, `SYNTAXSCOPE_PUBLIC_DIR`, `OLLAMA_HOST`,
    /// `OLLAMA_MODEL`, `OLLAMA_TIMEOUT` (seconds) and `PROCESS_LIMIT`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("SYNTAXSCOPE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("SYNTAXSCOPE_PUBLIC_DIR") {
            self.public_dir = PathBuf::from(dir);
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.ollama_host = normalize_ollama_host(&host);
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.ollama_model = model.trim().to_string();
        }
        if let Some(secs) = get("OLLAMA_TIMEOUT") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid OLLAMA_TIMEOUT `{secs}`: {e}"))?;
            self.ollama_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = get("PROCESS_LIMIT") {
            let limit: usize = limit
                .trim()
                .parse()
                .map_err(|e| anyhow!("invalid PROCESS_LIMIT `{limit}`: {e}"))?;
            self.augment.limit = (limit > 0).then_some(limit);
        }
        Ok(())
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("tldr").join("repo")
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.clone_dir().join("pages")
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("tldr").join("tldr_commands.json")
    }

    fn processed(&self, file: &str) -> PathBuf {
        self.data_dir.join("processed").join(file)
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.processed("enriched_commands.json")
    }

    pub fn ai_path(&self) -> PathBuf {
        self.processed("ai_explanations.json")
    }

    pub fn combined_path(&self) -> PathBuf {
        self.processed("combined_data.json")
    }

    pub fn export_path(&self) -> PathBuf {
        self.public_dir.join(EXPORT_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("pipeline.log")
    }

    pub fn rules_path(&self) -> Option<&Path> {
        self.rules_file.as_deref()
    }
}
