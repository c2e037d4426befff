//! SyntaxScope CLI
//!
//! Builds the shell-command catalog:
//! - `run`: every stage end to end
//! - `scrape`, `enrich`, `augment`, `combine`, `export`: one stage at a time,
//!   reading the previous stage's file from the data directory
//! - `validate`: check the combined and published files against the schema

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use syntaxscope_catalog::{load_json_array, DatasetSummary, RawEntry, Record};
use syntaxscope_llm::TextGenerator;

mod config;
mod logging;
mod pipeline;

use config::PipelineConfig;
use pipeline::{AiStatus, RunOptions};

#[derive(Parser)]
#[command(name = "syntaxscope")]
#[command(author, version, about = "SyntaxScope: shell command catalog pipeline")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Data directory (default: $SYNTAXSCOPE_DATA_DIR or `data_pipeline/data`).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the published `syntax.json`.
    #[arg(long, global = true)]
    public_dir: Option<PathBuf>,

    /// JSON rules file replacing the built-in category and tag tables.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Record schema replacing the embedded one.
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Corpus parsing threads.
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[arg(long, global = true)]
    ollama_host: Option<String>,

    #[arg(long, global = true)]
    ollama_model: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    ollama_timeout: Option<u64>,

    /// Seconds to pause between augmented records.
    #[arg(long, global = true)]
    pacing: Option<u64>,

    /// Do not mirror logs into `<data-dir>/logs/pipeline.log`.
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline: scrape → enrich → augment → combine → export.
    Run {
        #[arg(long)]
        skip_ai: bool,

        /// Augment only the first N records.
        #[arg(long)]
        limit: Option<usize>,

        /// Parse the existing corpus checkout without cloning or pulling.
        #[arg(long)]
        skip_fetch: bool,

        /// Use the built-in sample entries instead of the corpus.
        #[arg(long)]
        sample: bool,

        /// Extra record dataset merged by id (repeatable).
        #[arg(long = "extra-source")]
        extra_sources: Vec<PathBuf>,
    },

    /// Fetch the corpus and parse it into raw entries.
    Scrape {
        #[arg(long)]
        skip_fetch: bool,
    },

    /// Classify and tag the raw entries.
    Enrich,

    /// Add AI explanations and tags to enriched records.
    Augment {
        #[arg(long)]
        limit: Option<usize>,

        /// Enrich the built-in sample entries and augment those.
        #[arg(long)]
        sample: bool,
    },

    /// Reconcile enriched, AI and extra datasets into the combined dataset.
    Combine {
        #[arg(long = "extra-source")]
        extra_sources: Vec<PathBuf>,
    },

    /// Publish the combined dataset.
    Export,

    /// Validate the combined and published files against the schema.
    Validate,
}

fn build_config(global: &GlobalArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &global.public_dir {
        config.public_dir = dir.clone();
    }
    if let Some(rules) = &global.rules {
        config.rules_file = Some(rules.clone());
    }
    if let Some(schema) = &global.schema {
        config.schema_file = Some(schema.clone());
    }
    if let Some(workers) = global.workers {
        config.workers = workers.max(1);
    }
    if let Some(host) = &global.ollama_host {
        config.ollama_host = syntaxscope_llm::normalize_ollama_host(host);
    }
    if let Some(model) = &global.ollama_model {
        config.ollama_model = model.clone();
    }
    if let Some(secs) = global.ollama_timeout {
        config.ollama_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = global.pacing {
        config.augment.pacing = Duration::from_secs(secs);
    }
    if global.no_log_file {
        config.log_to_file = false;
    }
    Ok(config)
}

#[cfg(feature = "llm-ollama")]
fn build_generator(config: &PipelineConfig) -> Result<Option<Box<dyn TextGenerator>>> {
    let client = syntaxscope_llm::OllamaClient::new(
        &config.ollama_host,
        &config.ollama_model,
        config.ollama_timeout,
    )
    .map_err(|e| anyhow!("failed to create ollama client: {e}"))?;
    Ok(Some(Box::new(client)))
}

#[cfg(not(feature = "llm-ollama"))]
fn build_generator(_config: &PipelineConfig) -> Result<Option<Box<dyn TextGenerator>>> {
    tracing::warn!("built without an AI backend; augmentation is disabled");
    Ok(None)
}

fn print_summary(label: &str, summary: &DatasetSummary) {
    println!(
        "  {} {label}: {} records ({} with explanation, {} with tags)",
        "→".cyan(),
        summary.total.to_string().bold(),
        summary.with_explanation,
        summary.with_tags
    );
    for (category, count) in &summary.categories {
        println!("    {} {category}: {count}", "-".dimmed());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = build_config(&cli.global)?;

    let log_path = config.log_path();
    logging::init_tracing(config.log_to_file.then_some(log_path.as_path()))?;

    let now = Utc::now();

    match cli.command {
        Commands::Run {
            skip_ai,
            limit,
            skip_fetch,
            sample,
            extra_sources,
        } => {
            if let Some(limit) = limit {
                config.augment.limit = (limit > 0).then_some(limit);
            }
            let options = RunOptions {
                skip_fetch,
                skip_ai,
                sample,
                extra_sources,
            };
            let generator = if skip_ai { None } else { build_generator(&config)? };

            println!("{} SyntaxScope pipeline", "Running".green().bold());
            let report = pipeline::run_pipeline(&config, &options, generator.as_deref())?;

            println!(
                "  {} raw={} enriched={}",
                "→".cyan(),
                report.raw,
                report.enriched
            );
            match &report.ai {
                AiStatus::Skipped => println!("  {} AI augmentation skipped", "→".yellow()),
                AiStatus::Unavailable { reason } => {
                    println!("  {} AI augmentation unavailable: {reason}", "warn:".yellow().bold())
                }
                AiStatus::Completed { report } => println!(
                    "  {} AI added {} explanations, {} tag sets",
                    "→".cyan(),
                    report.explanations_added,
                    report.tags_added
                ),
            }
            print_summary("combined", &report.combined);
            if !report.schema_valid {
                println!(
                    "  {} combined data does not fully conform to the schema",
                    "warn:".yellow().bold()
                );
            }
            println!(
                "{} {} in {:.2}s",
                "wrote".green().bold(),
                report.export_path.display().to_string().bold(),
                report.elapsed.as_secs_f64()
            );
        }

        Commands::Scrape { skip_fetch } => {
            println!("{} corpus", "Scraping".green().bold());
            let entries = pipeline::scrape_stage(&config, skip_fetch, false, now)?;
            println!(
                "{} {} ({} entries)",
                "wrote".green().bold(),
                config.raw_path().display(),
                entries.len()
            );
        }

        Commands::Enrich => {
            let raw_path = config.raw_path();
            if !raw_path.exists() {
                return Err(anyhow!(
                    "raw entries not found at {} (run `syntaxscope scrape` first)",
                    raw_path.display()
                ));
            }
            let entries: Vec<RawEntry> = load_json_array(&raw_path);
            println!("{} {} entries", "Enriching".green().bold(), entries.len());
            let records = pipeline::enrich_stage(&config, entries, now)?;
            print_summary("enriched", &DatasetSummary::from_records(&records));
            println!("{} {}", "wrote".green().bold(), config.enriched_path().display());
        }

        Commands::Augment { limit, sample } => {
            if let Some(limit) = limit {
                config.augment.limit = (limit > 0).then_some(limit);
            }
            let records: Vec<Record> = if sample {
                pipeline::enrich_stage(&config, syntaxscope_llm::sample_entries(), now)?
            } else {
                let path = config.enriched_path();
                if !path.exists() {
                    return Err(anyhow!(
                        "enriched records not found at {} (run `syntaxscope enrich` or pass --sample)",
                        path.display()
                    ));
                }
                load_json_array(&path)
            };

            let generator = build_generator(&config)?
                .ok_or_else(|| anyhow!("no AI backend available in this build"))?;
            println!(
                "{} {} records with {}",
                "Augmenting".green().bold(),
                records.len(),
                generator.describe()
            );
            match pipeline::augment_stage(&config, records, generator.as_ref()) {
                (records, AiStatus::Completed { report }) => {
                    println!(
                        "  {} {} explanations, {} tag sets added",
                        "→".cyan(),
                        report.explanations_added,
                        report.tags_added
                    );
                    print_summary("augmented", &DatasetSummary::from_records(&records));
                    println!("{} {}", "wrote".green().bold(), config.ai_path().display());
                }
                (_, AiStatus::Unavailable { reason }) => {
                    return Err(anyhow!("augmentation unavailable: {reason}"));
                }
                (_, AiStatus::Skipped) => {}
            }
        }

        Commands::Combine { extra_sources } => {
            let enriched_path = config.enriched_path();
            if !enriched_path.exists() {
                return Err(anyhow!(
                    "enriched records not found at {}",
                    enriched_path.display()
                ));
            }
            let enriched: Vec<Record> = load_json_array(&enriched_path);
            let ai: Vec<Record> = load_json_array(&config.ai_path());
            let extra = pipeline::load_extra_sources(&extra_sources);
            println!(
                "{} {} enriched + {} AI records",
                "Combining".green().bold(),
                enriched.len(),
                ai.len()
            );
            let (combined, valid) = pipeline::combine_stage(&config, enriched, ai, extra, now)?;
            print_summary("combined", &DatasetSummary::from_records(&combined));
            if !valid {
                println!(
                    "  {} combined data does not fully conform to the schema",
                    "warn:".yellow().bold()
                );
            }
            println!("{} {}", "wrote".green().bold(), config.combined_path().display());
        }

        Commands::Export => {
            let count = pipeline::export_stage(&config)?;
            println!(
                "{} {} ({count} records)",
                "wrote".green().bold(),
                config.export_path().display()
            );
        }

        Commands::Validate => {
            let results = pipeline::validate_files(&config)?;
            let mut all_valid = true;
            for result in &results {
                if result.is_valid() {
                    println!("{} {}", "ok".green().bold(), result.path.display());
                } else {
                    all_valid = false;
                    println!("{} {}", "invalid".red().bold(), result.path.display());
                    for error in result.errors.iter().take(20) {
                        println!("    {} {error}", "-".dimmed());
                    }
                }
            }
            if !all_valid {
                return Err(anyhow!("some files failed validation"));
            }
        }
    }

    Ok(())
}
