//! Pipeline error types.

use thiserror::Error;

use crate::transcript::TranscriptError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Audio extraction failed: {0}")]
    AudioFailed(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Media error: {0}")]
    Media(#[from] vshorts_media::MediaError),

    #[error("Inference error: {0}")]
    Inference(#[from] vshorts_inference::InferenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn audio_failed(msg: impl Into<String>) -> Self {
        Self::AudioFailed(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    /// Whether a media input (source video) is missing.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PipelineError::Media(e) if e.is_missing_input())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
            || matches!(self, PipelineError::Media(vshorts_media::MediaError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_classification() {
        let missing = vshorts_media::MediaError::FileNotFound("/tmp/none.mp4".into());
        assert!(PipelineError::from(missing).is_missing_input());
        assert!(!PipelineError::from(TranscriptError::disabled("abc")).is_missing_input());
        assert!(!PipelineError::render_failed("x").is_missing_input());
    }

    #[test]
    fn test_cancelled_classification() {
        assert!(PipelineError::Cancelled.is_cancelled());
        assert!(PipelineError::from(vshorts_media::MediaError::Cancelled).is_cancelled());
        assert!(!PipelineError::render_failed("x").is_cancelled());
    }
}
