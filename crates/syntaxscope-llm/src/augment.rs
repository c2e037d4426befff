//! AI augmentation stage.
//!
//! For every record lacking an explanation or tags, ask the generator for the
//! missing field. Fields that are already populated are never re-queried, so
//! re-running over a finished dataset issues no calls and changes nothing.
//!
//! The stage is sequential: one blocking call at a time, a fixed pause between
//! records, and a checkpoint every `checkpoint_every` records plus after the
//! last one.

use crate::{explanation_prompt, parse_tags_response, tags_prompt, GenerateError, RetryPolicy, TextGenerator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use syntaxscope_catalog::{CheckpointSink, Record};

#[derive(Debug, Clone)]
pub struct AugmentConfig {
    pub retry: RetryPolicy,
    /// Pause between two records.
    pub pacing: Duration,
    pub checkpoint_every: usize,
    /// Only the first `limit` records are processed.
    pub limit: Option<usize>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            pacing: Duration::from_secs(1),
            checkpoint_every: 10,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AugmentReport {
    pub processed: usize,
    pub explanations_added: usize,
    pub tags_added: usize,
    pub explanation_failures: usize,
    pub tag_failures: usize,
    pub checkpoints: usize,
}

#[derive(Debug, Clone)]
pub struct AugmentOutcome {
    pub records: Vec<Record>,
    pub report: AugmentReport,
}

#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    #[error("text generator {backend} is unreachable: {source}")]
    Unreachable {
        backend: String,
        #[source]
        source: GenerateError,
    },
}

pub struct Augmentor<'a, G: TextGenerator + ?Sized> {
    generator: &'a G,
    config: AugmentConfig,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, G: TextGenerator + ?Sized> Augmentor<'a, G> {
    pub fn new(generator: &'a G, config: AugmentConfig) -> Self {
        Self {
            generator,
            config,
            clock: Utc::now,
        }
    }

    /// Replace the timestamp source used for `updated_at`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Augment `records`, checkpointing into `sink`.
    ///
    /// Fails only when the generator does not answer the initial probe; the
    /// caller should then carry on without augmentation.
    pub fn run(
        &self,
        mut records: Vec<Record>,
        sink: &mut dyn CheckpointSink,
    ) -> Result<AugmentOutcome, AugmentError> {
        let backend = self.generator.describe();
        self.generator
            .probe()
            .map_err(|source| AugmentError::Unreachable {
                backend: backend.clone(),
                source,
            })?;

        if let Some(limit) = self.config.limit.filter(|&l| l > 0) {
            if records.len() > limit {
                tracing::info!(limit, total = records.len(), "processing only the first records");
                records.truncate(limit);
            }
        }

        let total = records.len();
        tracing::info!(backend = %backend, records = total, "starting augmentation");

        let mut report = AugmentReport::default();
        let mut done: Vec<Record> = Vec::with_capacity(total);
        let every = self.config.checkpoint_every.max(1);

        for (i, mut record) in records.into_iter().enumerate() {
            tracing::info!(
                index = i + 1,
                total,
                id = %record.id,
                command = %record.command,
                "augmenting record"
            );
            self.augment_record(&mut record, &mut report);
            done.push(record);
            report.processed += 1;

            if (i + 1) % every == 0 || i + 1 == total {
                match sink.checkpoint(&done) {
                    Ok(()) => {
                        report.checkpoints += 1;
                        tracing::info!(processed = i + 1, total, "saved augmentation checkpoint");
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to save checkpoint"),
                }
            }

            if i + 1 < total && !self.config.pacing.is_zero() {
                std::thread::sleep(self.config.pacing);
            }
        }

        tracing::info!(
            processed = report.processed,
            explanations_added = report.explanations_added,
            tags_added = report.tags_added,
            "augmentation finished"
        );
        Ok(AugmentOutcome {
            records: done,
            report,
        })
    }

    fn augment_record(&self, record: &mut Record, report: &mut AugmentReport) {
        let mut changed = false;

        if !record.has_explanation() {
            match self.ask("explanation", &explanation_prompt(record)) {
                Some(text) => {
                    tracing::debug!(chars = text.len(), "added explanation");
                    record.explanation = Some(text);
                    report.explanations_added += 1;
                    changed = true;
                }
                None => {
                    tracing::warn!(command = %record.command, "no explanation obtained");
                    report.explanation_failures += 1;
                }
            }
        }

        if !record.has_tags() {
            let tags = self
                .ask("tags", &tags_prompt(record))
                .map(|reply| parse_tags_response(&reply))
                .unwrap_or_default();
            if tags.is_empty() {
                tracing::warn!(command = %record.command, "no tags obtained");
                report.tag_failures += 1;
            } else {
                tracing::debug!(tags = ?tags, "added tags");
                record.tags = tags;
                report.tags_added += 1;
                changed = true;
            }
        }

        if changed {
            record.updated_at = Some((self.clock)());
        }
    }

    /// One prompt under the retry policy; `None` when every attempt failed or
    /// the reply was blank.
    fn ask(&self, label: &str, prompt: &str) -> Option<String> {
        let reply = self
            .config
            .retry
            .run(label, |_| self.generator.generate(prompt), GenerateError::is_transient);
        match reply {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(err) => {
                tracing::error!(call = label, error = %err, "generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use syntaxscope_catalog::MemorySink;

    /// Replies are consumed in order; an exhausted script answers `Decode`.
    struct Scripted {
        alive: bool,
        replies: RefCell<VecDeque<Result<String, GenerateError>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, GenerateError>>) -> Self {
            Self {
                alive: true,
                replies: RefCell::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.borrow().len()
        }
    }

    impl TextGenerator for Scripted {
        fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(GenerateError::Decode("script exhausted".into())))
        }

        fn probe(&self) -> Result<(), GenerateError> {
            if self.alive {
                Ok(())
            } else {
                Err(GenerateError::Transport {
                    endpoint: "scripted".into(),
                    message: "connection refused".into(),
                })
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn old() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn config() -> AugmentConfig {
        AugmentConfig {
            retry: RetryPolicy::immediate(3),
            pacing: Duration::ZERO,
            checkpoint_every: 10,
            limit: None,
        }
    }

    fn record(id: &str, explanation: Option<&str>, tags: &[&str]) -> Record {
        let mut r = Record::new(id, format!("cmd-{id}"), "does things");
        r.category = "other".to_string();
        r.explanation = explanation.map(str::to_string);
        r.tags = tags.iter().map(|t| t.to_string()).collect();
        r.updated_at = Some(old());
        r
    }

    fn transport() -> GenerateError {
        GenerateError::Transport {
            endpoint: "scripted".into(),
            message: "reset".into(),
        }
    }

    #[test]
    fn complete_records_are_left_untouched() {
        let generator = Scripted::new(vec![]);
        let input = vec![
            record("a", Some("Already explained."), &["file"]),
            record("b", Some("Also done."), &["network", "search"]),
        ];
        let mut sink = MemorySink::default();

        let out = Augmentor::new(&generator, config())
            .run(input.clone(), &mut sink)
            .unwrap();

        assert_eq!(out.records, input);
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn transient_failures_are_retried_and_timestamp_moves_once() {
        let generator = Scripted::new(vec![
            Err(transport()),
            Err(GenerateError::Timeout {
                endpoint: "scripted".into(),
            }),
            Ok("  Runs the command.  "),
        ]);
        let mut sink = MemorySink::default();

        let out = Augmentor::new(&generator, config())
            .with_clock(fixed_now)
            .run(vec![record("a", None, &["file"])], &mut sink)
            .unwrap();

        let a = &out.records[0];
        assert_eq!(generator.calls(), 3);
        assert_eq!(a.explanation.as_deref(), Some("Runs the command."));
        assert_eq!(a.tags, vec!["file"]);
        assert_eq!(a.updated_at, Some(fixed_now()));
        assert_eq!(out.report.explanations_added, 1);
        assert_eq!(out.report.tags_added, 0);
    }

    #[test]
    fn tags_are_parsed_and_normalized() {
        let generator = Scripted::new(vec![Ok("```json\n[\"Search\", \"text\"]\n```")]);
        let mut sink = MemorySink::default();

        let out = Augmentor::new(&generator, config())
            .with_clock(fixed_now)
            .run(vec![record("a", Some("Explained."), &[])], &mut sink)
            .unwrap();

        assert_eq!(out.records[0].tags, vec!["search", "text"]);
        assert_eq!(out.records[0].updated_at, Some(fixed_now()));
    }

    #[test]
    fn exhausted_retries_leave_record_unchanged() {
        let generator = Scripted::new(vec![Err(transport()), Err(transport()), Err(transport())]);
        let mut sink = MemorySink::default();
        let input = record("a", None, &["file"]);

        let out = Augmentor::new(&generator, config())
            .run(vec![input.clone()], &mut sink)
            .unwrap();

        assert_eq!(generator.calls(), 3);
        assert_eq!(out.records, vec![input]);
        assert_eq!(out.report.explanation_failures, 1);
    }

    #[test]
    fn decode_errors_are_not_retried() {
        let generator = Scripted::new(vec![Err(GenerateError::Decode("garbage".into()))]);
        let mut sink = MemorySink::default();
        Augmentor::new(&generator, config())
            .run(vec![record("a", None, &["file"])], &mut sink)
            .unwrap();
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn checkpoints_every_n_and_after_last() {
        let replies: Vec<Result<&str, GenerateError>> = (0..25).map(|_| Ok("Explained.")).collect();
        let generator = Scripted::new(replies);
        let input: Vec<Record> = (0..25).map(|i| record(&format!("r{i}"), None, &["x"])).collect();
        let mut sink = MemorySink::default();

        let out = Augmentor::new(&generator, config())
            .run(input, &mut sink)
            .unwrap();

        let sizes: Vec<usize> = sink.snapshots.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 20, 25]);
        assert_eq!(out.report.checkpoints, 3);
    }

    #[test]
    fn limit_keeps_only_the_first_records() {
        let generator = Scripted::new(vec![Ok("One."), Ok("Two.")]);
        let input: Vec<Record> = (0..5).map(|i| record(&format!("r{i}"), None, &["x"])).collect();
        let mut sink = MemorySink::default();
        let mut cfg = config();
        cfg.limit = Some(2);

        let out = Augmentor::new(&generator, cfg).run(input, &mut sink).unwrap();

        let ids: Vec<&str> = out.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1"]);
        assert_eq!(generator.calls(), 2);
    }

    #[test]
    fn unreachable_generator_aborts_before_any_call() {
        let mut generator = Scripted::new(vec![Ok("never")]);
        generator.alive = false;
        let mut sink = MemorySink::default();

        let err = Augmentor::new(&generator, config())
            .run(vec![record("a", None, &[])], &mut sink)
            .unwrap_err();

        assert!(matches!(err, AugmentError::Unreachable { .. }));
        assert_eq!(generator.calls(), 0);
        assert!(sink.snapshots.is_empty());
    }
}
