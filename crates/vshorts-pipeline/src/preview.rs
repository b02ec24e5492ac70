//! Preview clip creation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use vshorts_models::{Interval, VideoRef};

use crate::cancel::CancelSignal;
use crate::events::EventLog;
use crate::extraction::ExtractionEngine;
use crate::metrics;
use crate::selector;
use crate::stages::Renderer;
use crate::transcript::TranscriptSource;

const START_PREVIEW_NAME: &str = "preview_start.mp4";

/// Cuts a single short preview for an already downloaded video.
pub struct PreviewService {
    transcripts: Arc<dyn TranscriptSource>,
    engine: Arc<ExtractionEngine>,
    renderer: Arc<dyn Renderer>,
    max_duration: f64,
    use_inference: bool,
}

impl PreviewService {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        engine: Arc<ExtractionEngine>,
        renderer: Arc<dyn Renderer>,
        max_duration: f64,
    ) -> Self {
        Self {
            transcripts,
            engine,
            renderer,
            max_duration,
            use_inference: true,
        }
    }

    /// Always cut the opening window instead of asking the model.
    pub fn static_only(mut self) -> Self {
        self.use_inference = false;
        self
    }

    /// Create the preview and return its path, or `None` if rendering failed.
    pub async fn create_preview(
        &self,
        video_file: &Path,
        video: &VideoRef,
        cancel: &CancelSignal,
    ) -> Option<PathBuf> {
        if self.use_inference {
            if let Some(interval) = self.choose_interval(video, cancel).await {
                let name = format!("preview_{}-{}.mp4", interval.start as u64, interval.end as u64);
                return self.cut(video_file, &name, interval).await;
            }
            info!(video_id = %video.id, "No candidate moments, using opening preview");
        }

        self.cut(video_file, START_PREVIEW_NAME, Interval::new(0.0, self.max_duration))
            .await
    }

    async fn choose_interval(&self, video: &VideoRef, cancel: &CancelSignal) -> Option<Interval> {
        let text = match self.transcripts.get(video).await {
            Ok(transcript) => transcript.text().to_string(),
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Transcript unavailable for preview");
                String::new()
            }
        };

        let candidates = match self
            .engine
            .extract(&text, &[], &EventLog::new(), cancel)
            .await
        {
            Ok(outcome) => outcome.timecodes,
            Err(e) => {
                warn!(video_id = %video.id, error = %e, "Preview extraction failed");
                Vec::new()
            }
        };

        if candidates.is_empty() {
            return None;
        }

        Some(selector::select(&candidates, self.max_duration).capped(self.max_duration))
    }

    async fn cut(&self, video_file: &Path, name: &str, interval: Interval) -> Option<PathBuf> {
        match self
            .renderer
            .cut(video_file, name, interval.start, interval.end)
            .await
        {
            Ok(path) => {
                metrics::record_clip_rendered("preview");
                info!(output = %path.display(), "Preview created");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create preview");
                None
            }
        }
    }
}
