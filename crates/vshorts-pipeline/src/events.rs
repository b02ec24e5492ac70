//! Append-only event log and its durable sink.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tracing::info;
use vshorts_models::{PipelineEvent, Stage};

use crate::error::PipelineResult;
use crate::metrics;

/// Shared, append-only list of pipeline events.
///
/// Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PipelineEvent>> {
        // Appends cannot leave the vector half-written.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, event: PipelineEvent) {
        metrics::record_stage_duration(event.stage.as_str(), event.duration_sec);
        self.lock().push(event);
    }

    /// Append an event for work that started at `started_at` and took `elapsed`.
    pub fn record(
        &self,
        stage: Stage,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        detail: Option<String>,
    ) {
        let mut event = PipelineEvent::new(started_at, stage, elapsed);
        event.detail = detail;
        self.append(event);
    }

    pub fn snapshot(&self) -> Vec<PipelineEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Measures one unit of work for the event log.
#[derive(Debug)]
pub struct StageTimer {
    stage: Stage,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the elapsed time into `log`.
    pub fn finish(self, log: &EventLog, detail: Option<String>) -> Duration {
        let elapsed = self.elapsed();
        log.record(self.stage, self.started_at, elapsed, detail);
        elapsed
    }
}

/// Durable destination for a run's events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist the events of one run and return where they went.
    async fn persist(&self, events: &[PipelineEvent]) -> PipelineResult<PathBuf>;
}

/// Writes each run's events as pretty JSON to
/// `<dir>/pipeline_events_<YYYYmmdd_HHMMSS>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileEventSink {
    dir: PathBuf,
}

impl JsonFileEventSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn file_name(at: DateTime<Local>) -> String {
        format!("pipeline_events_{}.json", at.format("%Y%m%d_%H%M%S"))
    }
}

#[async_trait]
impl EventSink for JsonFileEventSink {
    async fn persist(&self, events: &[PipelineEvent]) -> PipelineResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(Self::file_name(Local::now()));
        let json = serde_json::to_vec_pretty(events)?;
        tokio::fs::write(&path, json).await?;

        info!(path = %path.display(), count = events.len(), "Saved pipeline events");
        Ok(path)
    }
}
