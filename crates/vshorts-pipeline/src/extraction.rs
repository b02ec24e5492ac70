//! Concurrent timecode extraction engine.
//!
//! A transcript is split into chunks, the chunks are grouped into batches and
//! every chunk in a batch runs prompt → inference → parse as its own tokio
//! task. A semaphore bounds the calls in flight, each batch is a barrier, and a
//! fixed pacing delay separates batches. Per-chunk failures only empty that
//! chunk; cancellation discards the whole run.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vshorts_inference::{InferenceClient, InferenceError, PromptBuilder};
use vshorts_models::{PopularitySegment, Stage, Timecode, TranscriptChunk};

use crate::cancel::CancelSignal;
use crate::chunker;
use crate::config::ExtractionConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::events::EventLog;
use crate::metrics;
use crate::parser::{self, ParseReport};

/// Lifecycle of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Idle,
    Chunking,
    Dispatching,
    Awaiting,
    Aggregating,
    Done,
    /// Reached only through cancellation.
    Failed,
}

/// Counters describing one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub chunks: usize,
    /// Chunks whose inference call failed or timed out
    pub failed_chunks: usize,
    /// Chunks whose response held no timecode
    pub empty_chunks: usize,
    /// Response lines the parser skipped
    pub ignored_lines: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    /// Timecodes in chunk order, parse order within a chunk
    pub timecodes: Vec<Timecode>,
    pub stats: ExtractionStats,
}

struct ChunkOutcome {
    index: usize,
    result: Result<ParseReport, InferenceError>,
}

/// Fans transcript chunks out to an [`InferenceClient`].
pub struct ExtractionEngine {
    client: Arc<dyn InferenceClient>,
    prompts: PromptBuilder,
    config: ExtractionConfig,
    semaphore: Arc<Semaphore>,
    state: watch::Sender<ExtractionState>,
}

impl ExtractionEngine {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        prompts: PromptBuilder,
        config: ExtractionConfig,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let (state, _) = watch::channel(ExtractionState::Idle);

        Ok(Self {
            client,
            prompts,
            semaphore: Arc::new(Semaphore::new(config.concurrency_limit)),
            config,
            state,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn state(&self) -> ExtractionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ExtractionState) {
        debug!(state = ?state, "Extraction state");
        self.state.send_replace(state);
    }

    /// Extract timecodes from a whole transcript.
    ///
    /// Every inference call is appended to `events` as a [`Stage::Inference`]
    /// entry.
    pub async fn extract(
        &self,
        text: &str,
        hints: &[PopularitySegment],
        events: &EventLog,
        cancel: &CancelSignal,
    ) -> PipelineResult<ExtractionOutcome> {
        self.set_state(ExtractionState::Chunking);
        let chunks = match chunker::split(text, self.config.max_chunk_length) {
            Ok(chunks) => chunks,
            Err(e) => {
                self.set_state(ExtractionState::Idle);
                return Err(e);
            }
        };

        let result = self.run_batches(chunks, hints, events, cancel).await;
        self.set_state(if result.is_ok() {
            ExtractionState::Done
        } else {
            ExtractionState::Failed
        });
        result
    }

    async fn run_batches(
        &self,
        chunks: Vec<TranscriptChunk>,
        hints: &[PopularitySegment],
        events: &EventLog,
        cancel: &CancelSignal,
    ) -> PipelineResult<ExtractionOutcome> {
        let total = chunks.len();
        let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(total);
        let mut lost_tasks = 0;

        if total > 0 {
            info!(
                chunks = total,
                batch_size = self.config.batch_size,
                concurrency = self.config.concurrency_limit,
                "Dispatching transcript chunks"
            );
        }

        let batches: Vec<&[TranscriptChunk]> = chunks.chunks(self.config.batch_size).collect();
        let batch_count = batches.len();

        for (batch_index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            self.set_state(ExtractionState::Dispatching);
            let mut tasks = JoinSet::new();
            for chunk in batch {
                self.spawn_chunk(&mut tasks, chunk, hints, events.clone());
            }

            self.set_state(ExtractionState::Awaiting);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tasks.abort_all();
                        warn!(batch = batch_index, "Extraction cancelled, discarding results");
                        return Err(PipelineError::Cancelled);
                    }
                    joined = tasks.join_next() => match joined {
                        Some(Ok(outcome)) => outcomes.push(outcome),
                        Some(Err(e)) => {
                            warn!(batch = batch_index, error = %e, "Chunk task did not complete");
                            lost_tasks += 1;
                        }
                        None => break,
                    }
                }
            }

            if batch_index + 1 < batch_count && !self.config.batch_pacing.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                    _ = tokio::time::sleep(self.config.batch_pacing) => {}
                }
            }
        }

        self.set_state(ExtractionState::Aggregating);
        Ok(aggregate(total, outcomes, lost_tasks))
    }

    fn spawn_chunk(
        &self,
        tasks: &mut JoinSet<ChunkOutcome>,
        chunk: &TranscriptChunk,
        hints: &[PopularitySegment],
        events: EventLog,
    ) {
        let index = chunk.index;
        let prompt = self.prompts.build(chunk, hints);
        let client = Arc::clone(&self.client);
        let semaphore = Arc::clone(&self.semaphore);
        let timeout = self.config.inference_timeout;

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ChunkOutcome {
                        index,
                        result: Err(InferenceError::request_failed("inference semaphore closed")),
                    }
                }
            };

            let started_at = Utc::now();
            let started = Instant::now();

            let result = match tokio::time::timeout(timeout, client.infer(&prompt, timeout)).await {
                Ok(result) => result,
                Err(_) => Err(InferenceError::timeout(timeout)),
            };

            let elapsed = started.elapsed();
            let outcome_label = match &result {
                Ok(_) => "ok",
                Err(e) => e.kind(),
            };
            metrics::record_inference_call(outcome_label, elapsed.as_secs_f64());
            events.record(
                Stage::Inference,
                started_at,
                elapsed,
                Some(format!("chunk={} outcome={}", index, outcome_label)),
            );

            ChunkOutcome {
                index,
                result: result.map(|response| parser::parse(&response)),
            }
        });
    }
}

fn aggregate(total: usize, mut outcomes: Vec<ChunkOutcome>, lost_tasks: usize) -> ExtractionOutcome {
    outcomes.sort_by_key(|o| o.index);

    let mut stats = ExtractionStats {
        chunks: total,
        failed_chunks: lost_tasks,
        ..Default::default()
    };
    let mut timecodes = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(report) => {
                stats.ignored_lines += report.ignored_lines;
                if report.is_empty() {
                    stats.empty_chunks += 1;
                    warn!(
                        chunk = outcome.index,
                        ignored_lines = report.ignored_lines,
                        "No timecodes found in model response"
                    );
                }
                timecodes.extend(report.timecodes);
            }
            Err(e) => {
                stats.failed_chunks += 1;
                warn!(chunk = outcome.index, error = %e, "Inference failed for chunk");
            }
        }
    }

    metrics::record_ignored_lines(stats.ignored_lines);
    metrics::record_timecodes_extracted(timecodes.len());

    info!(
        chunks = stats.chunks,
        failed = stats.failed_chunks,
        empty = stats.empty_chunks,
        ignored_lines = stats.ignored_lines,
        timecodes = timecodes.len(),
        "Extraction finished"
    );

    ExtractionOutcome { timecodes, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use vshorts_inference::InferenceResult;

    /// Answers every prompt with the same text.
    struct FixedClient(&'static str);

    #[async_trait]
    impl InferenceClient for FixedClient {
        async fn infer(&self, _prompt: &str, _timeout: Duration) -> InferenceResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn engine(client: impl InferenceClient + 'static, max_chunk_length: usize) -> ExtractionEngine {
        ExtractionEngine::new(
            Arc::new(client),
            PromptBuilder::default(),
            ExtractionConfig {
                max_chunk_length,
                batch_pacing: Duration::from_millis(1),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_transcript_yields_no_timecodes() {
        let engine = engine(FixedClient("00:00 - 00:10 x"), 10);
        let events = EventLog::new();
        let outcome = engine
            .extract("", &[], &events, &CancelSignal::never())
            .await
            .unwrap();

        assert!(outcome.timecodes.is_empty());
        assert_eq!(outcome.stats, ExtractionStats::default());
        assert_eq!(engine.state(), ExtractionState::Done);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_every_chunk_contributes() {
        let engine = engine(FixedClient("00:00 - 00:10 Intro\nnoise"), 5);
        let events = EventLog::new();
        let outcome = engine
            .extract("abcdefghijklm", &[], &events, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome.stats.chunks, 3);
        assert_eq!(outcome.timecodes.len(), 3);
        assert_eq!(outcome.stats.ignored_lines, 3);
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_responses_are_counted() {
        let engine = engine(FixedClient("I could not find anything."), 5);
        let outcome = engine
            .extract("abcdefghij", &[], &EventLog::new(), &CancelSignal::never())
            .await
            .unwrap();

        assert!(outcome.timecodes.is_empty());
        assert_eq!(outcome.stats.empty_chunks, 2);
        assert_eq!(outcome.stats.failed_chunks, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = ExtractionEngine::new(
            Arc::new(FixedClient("")),
            PromptBuilder::default(),
            ExtractionConfig {
                batch_size: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_aggregate_orders_by_chunk_index() {
        let outcomes = vec![
            ChunkOutcome {
                index: 1,
                result: Ok(parser::parse("00:20 - 00:30 second")),
            },
            ChunkOutcome {
                index: 0,
                result: Ok(parser::parse("00:00 - 00:10 first\n00:10 - 00:15 also first")),
            },
            ChunkOutcome {
                index: 2,
                result: Err(InferenceError::timeout(Duration::from_secs(1))),
            },
        ];

        let outcome = aggregate(3, outcomes, 0);
        let texts: Vec<_> = outcome.timecodes.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "also first", "second"]);
        assert_eq!(outcome.stats.failed_chunks, 1);
    }
}
