//! Transcript sources and persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};
use vshorts_models::{format_seconds, Transcript, VideoRef};

use crate::retry::{retry_async, RetryConfig};

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Transcript not found: {0}")]
    NotFound(String),

    #[error("Transcripts disabled: {0}")]
    Disabled(String),

    #[error("Transcript temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscriptError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn disabled(msg: impl Into<String>) -> Self {
        Self::Disabled(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Only temporary unavailability is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, TranscriptError::Unavailable(_))
    }
}

/// Supplies raw transcript text for a video.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn get(&self, video: &VideoRef) -> Result<Transcript, TranscriptError>;
}

/// Fetch a transcript, retrying temporary unavailability with backoff.
pub async fn fetch_with_retry(
    source: &dyn TranscriptSource,
    video: &VideoRef,
    retries: u32,
    base_delay: Duration,
) -> Result<Transcript, TranscriptError> {
    let config = RetryConfig::new("transcript_fetch")
        .with_max_retries(retries)
        .with_base_delay(base_delay);

    retry_async(&config, || source.get(video), TranscriptError::is_transient).await
}

/// Loads `<dir>/<video_id>.txt`.
#[derive(Debug, Clone)]
pub struct FileTranscriptSource {
    dir: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn get(&self, video: &VideoRef) -> Result<Transcript, TranscriptError> {
        let path = self.dir.join(format!("{}.txt", video.id));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Transcript::new(video.id.clone(), text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TranscriptError::not_found(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// One timed caption line.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Writes fetched transcripts next to each other for later offline runs.
#[derive(Debug, Clone)]
pub struct TranscriptSaver {
    dir: PathBuf,
}

impl TranscriptSaver {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Save `<dir>/<id>_<YYYYmmdd_HHMMSS>_<lang>.txt` and, when segments are
    /// given, a sibling `_segments.txt` with `start-end: text` lines.
    pub async fn save(
        &self,
        transcript: &Transcript,
        lang: &str,
        segments: &[TranscriptSegment],
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let stem = format!(
            "{}_{}_{}",
            transcript.video_id(),
            Local::now().format("%Y%m%d_%H%M%S"),
            lang
        );
        let path = self.dir.join(format!("{}.txt", stem));
        tokio::fs::write(&path, transcript.text()).await?;

        if !segments.is_empty() {
            let lines: String = segments
                .iter()
                .map(|s| {
                    format!(
                        "{}-{}: {}\n",
                        format_seconds(s.start),
                        format_seconds(s.end),
                        s.text
                    )
                })
                .collect();
            tokio::fs::write(self.dir.join(format!("{}_segments.txt", stem)), lines).await?;
        }

        info!(path = %path.display(), lang = %lang, "Saved transcript");
        Ok(path)
    }

    /// Like [`save`](Self::save), logging instead of failing.
    pub async fn save_or_warn(
        &self,
        transcript: &Transcript,
        lang: &str,
        segments: &[TranscriptSegment],
    ) {
        if let Err(e) = self.save(transcript, lang, segments).await {
            warn!(video_id = %transcript.video_id(), error = %e, "Failed to save transcript");
        }
    }
}
