//! Pipeline orchestration: download → audio → transcript → extraction →
//! filtering → rendering.
//!
//! Stages run sequentially. Any stage failure aborts the run; the report then
//! carries no outputs together with the failed stage and its reason.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn, Instrument};
use vshorts_models::{PipelineEvent, PopularitySegment, Stage, Timecode, VideoRef};

use crate::cancel::CancelSignal;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{EventLog, EventSink, StageTimer};
use crate::extraction::{ExtractionEngine, ExtractionStats};
use crate::filter::ContentFilter;
use crate::logging::RunLogger;
use crate::metrics;
use crate::stages::{AudioAnalyzer, Renderer, VideoDownloader};
use crate::transcript::{fetch_with_retry, TranscriptSource};

/// Base delay between transcript fetch retries.
const TRANSCRIPT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Pipeline states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Downloading,
    ExtractingAudio,
    Transcribing,
    ExtractingTimecodes,
    Filtering,
    Rendering,
    Completed,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Created => "created",
            PipelineState::Downloading => "downloading",
            PipelineState::ExtractingAudio => "extracting_audio",
            PipelineState::Transcribing => "transcribing",
            PipelineState::ExtractingTimecodes => "extracting_timecodes",
            PipelineState::Filtering => "filtering",
            PipelineState::Rendering => "rendering",
            PipelineState::Completed => "completed",
            PipelineState::Aborted => "aborted",
        }
    }

    fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Downloading => PipelineState::Downloading,
            Stage::ExtractingAudio => PipelineState::ExtractingAudio,
            Stage::Transcribing => PipelineState::Transcribing,
            Stage::ExtractingTimecodes | Stage::Inference => PipelineState::ExtractingTimecodes,
            Stage::Filtering => PipelineState::Filtering,
            Stage::Rendering => PipelineState::Rendering,
        }
    }
}

/// Why a run aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
    pub cancelled: bool,
}

impl StageFailure {
    fn new(stage: Stage, error: &PipelineError) -> Self {
        Self {
            stage,
            reason: error.to_string(),
            cancelled: error.is_cancelled(),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub video: VideoRef,
    pub final_state: PipelineState,
    /// Every state entered, in order
    pub transitions: Vec<PipelineState>,
    /// Rendered clips; always empty for an aborted run
    pub outputs: Vec<PathBuf>,
    /// Timecodes that survived filtering
    pub timecodes: Vec<Timecode>,
    pub extraction: Option<ExtractionStats>,
    /// Clips skipped because their interval was empty or their encode failed
    pub skipped_clips: usize,
    pub failure: Option<StageFailure>,
    pub events: Vec<PipelineEvent>,
    pub events_file: Option<PathBuf>,
}

impl PipelineReport {
    fn new(video: VideoRef) -> Self {
        Self {
            video,
            final_state: PipelineState::Created,
            transitions: vec![PipelineState::Created],
            outputs: Vec::new(),
            timecodes: Vec::new(),
            extraction: None,
            skipped_clips: 0,
            failure: None,
            events: Vec::new(),
            events_file: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.final_state == PipelineState::Completed
    }

    pub fn is_aborted(&self) -> bool {
        self.final_state == PipelineState::Aborted
    }
}

/// External collaborators used by the orchestrator.
pub struct Collaborators {
    pub downloader: Arc<dyn VideoDownloader>,
    /// Optional audio popularity stage
    pub audio: Option<Arc<dyn AudioAnalyzer>>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub renderer: Arc<dyn Renderer>,
    pub event_sink: Option<Arc<dyn EventSink>>,
}

struct RenderSummary {
    outputs: Vec<PathBuf>,
    skipped: usize,
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    engine: Arc<ExtractionEngine>,
    filter: ContentFilter,
    collaborators: Collaborators,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<ExtractionEngine>,
        collaborators: Collaborators,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let filter = ContentFilter::new(&config.banned_phrases);

        Ok(Self {
            config,
            engine,
            filter,
            collaborators,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline for one video. Failures are reported, never
    /// returned.
    pub async fn run(&self, video: &VideoRef, cancel: &CancelSignal) -> PipelineReport {
        let logger = RunLogger::new(&video.id);
        let span = logger.create_span();
        self.run_logged(video, cancel, logger).instrument(span).await
    }

    async fn run_logged(
        &self,
        video: &VideoRef,
        cancel: &CancelSignal,
        logger: RunLogger,
    ) -> PipelineReport {
        logger.log_start(&video.url);

        let events = EventLog::new();
        let stages = StageRunner {
            events: &events,
            cancel,
            logger: &logger,
        };
        let mut report = PipelineReport::new(video.clone());

        match self.execute(video, &stages, &mut report).await {
            Ok(()) => {
                report.transitions.push(PipelineState::Completed);
                report.final_state = PipelineState::Completed;
                logger.log_completion(report.outputs.len());
            }
            Err(failure) => {
                report.transitions.push(PipelineState::Aborted);
                report.final_state = PipelineState::Aborted;
                report.outputs.clear();
                logger.log_stage_failed(failure.stage, &failure.reason, failure.cancelled);
                report.failure = Some(failure);
            }
        }

        report.events = events.snapshot();
        if let Some(sink) = &self.collaborators.event_sink {
            match sink.persist(&report.events).await {
                Ok(path) => report.events_file = Some(path),
                Err(e) => logger.log_warning(&format!("Failed to persist events: {}", e)),
            }
        }

        metrics::record_run(report.final_state.as_str());
        report
    }

    async fn execute(
        &self,
        video: &VideoRef,
        stages: &StageRunner<'_>,
        report: &mut PipelineReport,
    ) -> Result<(), StageFailure> {
        if video.id.as_str().trim().is_empty() {
            return Err(StageFailure::new(
                Stage::Downloading,
                &PipelineError::invalid_input("video identifier cannot be empty"),
            ));
        }
        let work_dir = self.config.work_dir.join(video.id.as_str());

        let source = stages
            .run(report, Stage::Downloading, async {
                tokio::fs::create_dir_all(&work_dir).await?;
                self.collaborators.downloader.download(video, &work_dir).await
            })
            .await?;

        let hints: Vec<PopularitySegment> = match &self.collaborators.audio {
            Some(audio) => {
                stages
                    .run(report, Stage::ExtractingAudio, audio.analyze(&source))
                    .await?
            }
            None => Vec::new(),
        };

        let transcript = stages
            .run(report, Stage::Transcribing, async {
                fetch_with_retry(
                    self.collaborators.transcripts.as_ref(),
                    video,
                    self.config.transcript_retries,
                    TRANSCRIPT_RETRY_DELAY,
                )
                .await
                .map_err(PipelineError::from)
            })
            .await?;

        if transcript.is_empty() {
            stages.logger.log_warning("Transcript is empty");
        }

        // The engine observes `cancel` itself and records its terminal state.
        let outcome = stages
            .observe(
                report,
                Stage::ExtractingTimecodes,
                self.engine
                    .extract(transcript.text(), &hints, stages.events, stages.cancel),
            )
            .await?;
        report.extraction = Some(outcome.stats);

        let extracted = outcome.timecodes.len();
        let kept = stages
            .run(report, Stage::Filtering, async {
                Ok(self.filter.filter(outcome.timecodes))
            })
            .await?;
        metrics::record_timecodes_filtered(extracted - kept.len());
        info!(
            extracted = extracted,
            kept = kept.len(),
            "Filtered timecodes"
        );
        report.timecodes = kept;

        let timecodes = report.timecodes.clone();
        let summary = stages
            .run(report, Stage::Rendering, self.render_all(&source, &timecodes))
            .await?;
        report.outputs = summary.outputs;
        report.skipped_clips = summary.skipped;

        Ok(())
    }

    async fn render_all(&self, source: &Path, timecodes: &[Timecode]) -> PipelineResult<RenderSummary> {
        let mut summary = RenderSummary {
            outputs: Vec::new(),
            skipped: 0,
        };

        for timecode in timecodes {
            let Some(interval) = timecode.interval() else {
                warn!(start = %timecode.start, end = %timecode.end, "Skipping unparseable timecode");
                summary.skipped += 1;
                continue;
            };

            let cut = interval.capped(self.config.max_clip_duration);
            if cut.duration() <= 0.0 {
                warn!(start = cut.start, end = cut.end, "Skipping empty interval");
                summary.skipped += 1;
                continue;
            }

            let name = format!("short_{}-{}.mp4", cut.start as u64, cut.end as u64);
            match self
                .collaborators
                .renderer
                .cut(source, &name, cut.start, cut.end)
                .await
            {
                Ok(path) => {
                    metrics::record_clip_rendered("short");
                    info!(output = %path.display(), text = %timecode.text, "Rendered short");
                    summary.outputs.push(path);
                }
                Err(e) if e.is_missing_input() || e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        start = cut.start,
                        end = cut.end,
                        error = %e,
                        "Failed to render clip, skipping"
                    );
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Shared per-run context for entering stages.
struct StageRunner<'a> {
    events: &'a EventLog,
    cancel: &'a CancelSignal,
    logger: &'a RunLogger,
}

impl StageRunner<'_> {
    /// Enter `stage` and run `work` unless cancelled first.
    async fn run<T, F>(
        &self,
        report: &mut PipelineReport,
        stage: Stage,
        work: F,
    ) -> Result<T, StageFailure>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        let cancel = self.cancel;
        self.observe(report, stage, async move {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                result = work => result,
            }
        })
        .await
    }

    /// Enter `stage` and drive `work` to completion, recording its timing.
    async fn observe<T, F>(
        &self,
        report: &mut PipelineReport,
        stage: Stage,
        work: F,
    ) -> Result<T, StageFailure>
    where
        F: Future<Output = PipelineResult<T>>,
    {
        let state = PipelineState::for_stage(stage);
        report.transitions.push(state);
        report.final_state = state;
        self.logger.log_stage(stage);

        let timer = StageTimer::start(stage);
        match work.await {
            Ok(value) => {
                timer.finish(self.events, None);
                Ok(value)
            }
            Err(e) => {
                timer.finish(self.events, Some(format!("failed: {}", e)));
                Err(StageFailure::new(stage, &e))
            }
        }
    }
}
