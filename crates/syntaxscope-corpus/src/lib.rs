//! Raw record source for SyntaxScope: the tldr-pages corpus.
//!
//! - `fetch`: clone or update the corpus checkout with `git`
//! - `page`: parse one markdown page into a [`RawEntry`]
//! - `shell`: shell guessing for pages outside a known platform directory
//!
//! [`scrape_pages`] walks a `pages/` tree and parses every page on a bounded
//! rayon pool. Pages are independent; a page that fails to parse is logged
//! and left out of the result.

pub mod fetch;
pub mod page;
pub mod shell;

pub use fetch::*;
pub use page::*;
pub use shell::*;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use syntaxscope_catalog::RawEntry;
use walkdir::WalkDir;

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pages directory not found at {0}")]
    PagesDirMissing(PathBuf),
    #[error("invalid page {path}: {reason}")]
    InvalidPage { path: PathBuf, reason: String },
    #[error("failed to run `git {action}`: {source}")]
    GitSpawn {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("`git {action}` failed: {stderr}")]
    Git {
        action: &'static str,
        stderr: String,
    },
    #[error("invalid page pattern: {0}")]
    Pattern(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub pages: usize,
    pub entries: Vec<RawEntry>,
    pub failures: Vec<(PathBuf, String)>,
}

/// All `*.md` files below `pages_dir`, sorted.
pub fn collect_pages(pages_dir: &Path) -> Result<Vec<PathBuf>, CorpusError> {
    if !pages_dir.is_dir() {
        return Err(CorpusError::PagesDirMissing(pages_dir.to_path_buf()));
    }

    let mut pages: Vec<PathBuf> = WalkDir::new(pages_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            // Skip hidden directories such as `.git`.
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable corpus entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect();
    pages.sort();
    Ok(pages)
}

/// Parse every page below `pages_dir` on a pool of `workers` threads.
pub fn scrape_pages(
    pages_dir: &Path,
    workers: usize,
    now: DateTime<Utc>,
) -> Result<ScrapeReport, CorpusError> {
    let pages = collect_pages(pages_dir)?;
    tracing::info!(pages = pages.len(), workers, dir = %pages_dir.display(), "found corpus pages");

    let parser = PageParser::new()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()?;

    let results: Vec<(PathBuf, Result<RawEntry, CorpusError>)> = pool.install(|| {
        pages
            .par_iter()
            .map(|path| (path.clone(), parser.parse_page(path, now)))
            .collect()
    });

    let mut report = ScrapeReport {
        pages: pages.len(),
        ..Default::default()
    };
    for (path, result) in results {
        match result {
            Ok(entry) => report.entries.push(entry),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to parse page");
                report.failures.push((path, err.to_string()));
            }
        }
    }

    tracing::info!(
        entries = report.entries.len(),
        failures = report.failures.len(),
        "scraped corpus"
    );
    Ok(report)
}
