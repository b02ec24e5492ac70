//! Per-run log context.

use tracing::{error, info, warn, Span};
use uuid::Uuid;
use vshorts_models::{Stage, VideoId};

/// Log context for one pipeline run over one video.
///
/// Lines carry the run ID and video ID so interleaved runs stay separable.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    video_id: VideoId,
}

impl RunLogger {
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            video_id: video_id.clone(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    /// Span wrapping every line of the run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id, video_id = %self.video_id)
    }

    pub fn log_start(&self, url: &str) {
        info!(run_id = %self.run_id, video_id = %self.video_id, url = %url, "Pipeline run started");
    }

    /// A stage was entered.
    pub fn log_stage(&self, stage: Stage) {
        info!(run_id = %self.run_id, video_id = %self.video_id, stage = %stage, "Entering stage");
    }

    /// A stage failed and the run will abort.
    pub fn log_stage_failed(&self, stage: Stage, reason: &str, cancelled: bool) {
        if cancelled {
            warn!(run_id = %self.run_id, video_id = %self.video_id, stage = %stage, "Run cancelled");
        } else {
            error!(
                run_id = %self.run_id,
                video_id = %self.video_id,
                stage = %stage,
                reason = %reason,
                "Stage failed, aborting run"
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!(run_id = %self.run_id, video_id = %self.video_id, "{}", message);
    }

    /// The run finished every stage.
    pub fn log_completion(&self, outputs: usize) {
        if outputs == 0 {
            warn!(
                run_id = %self.run_id,
                video_id = %self.video_id,
                "No interesting moments found, nothing rendered"
            );
        } else {
            info!(
                run_id = %self.run_id,
                video_id = %self.video_id,
                outputs = outputs,
                "Pipeline run completed"
            );
        }
    }
}
