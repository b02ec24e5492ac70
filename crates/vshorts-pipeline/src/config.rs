//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

/// Phrases marking promotional or sponsor segments.
pub const DEFAULT_BANNED_PHRASES: &[&str] = &[
    "sponsor",
    "promo code",
    "discount code",
    "use my link",
    "subscribe to",
    "реклама",
    "промокод",
    "подпишись",
];

/// Settings for the concurrent extraction engine.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Maximum inference calls in flight
    pub concurrency_limit: usize,
    /// Chunks dispatched per batch
    pub batch_size: usize,
    /// Sleep inserted between batches
    pub batch_pacing: Duration,
    /// Per-call timeout
    pub inference_timeout: Duration,
    /// Maximum chunk length in characters
    pub max_chunk_length: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 2,
            batch_size: 2,
            batch_pacing: Duration::from_millis(100),
            inference_timeout: Duration::from_secs(120),
            max_chunk_length: 2000,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.concurrency_limit == 0 {
            return Err(PipelineError::invalid_input("concurrency limit must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::invalid_input("batch size must be at least 1"));
        }
        if self.max_chunk_length == 0 {
            return Err(PipelineError::invalid_input("max chunk length must be at least 1"));
        }
        if self.inference_timeout.is_zero() {
            return Err(PipelineError::invalid_input("inference timeout must be positive"));
        }
        Ok(())
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub extraction: ExtractionConfig,
    /// Case-insensitive phrases removing a timecode
    pub banned_phrases: Vec<String>,
    /// Maximum rendered clip length in seconds
    pub max_clip_duration: f64,
    /// Maximum preview length in seconds
    pub preview_max_duration: f64,
    /// Work directory for downloads and intermediate files
    pub work_dir: PathBuf,
    /// Where rendered shorts land
    pub output_dir: PathBuf,
    /// Where per-run event files are written
    pub events_dir: PathBuf,
    /// Preferred subtitle languages, in order
    pub transcript_languages: Vec<String>,
    /// Retries for a temporarily unavailable transcript
    pub transcript_retries: u32,
    /// Prompt template override
    pub prompt_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            banned_phrases: DEFAULT_BANNED_PHRASES.iter().map(|s| s.to_string()).collect(),
            max_clip_duration: 60.0,
            preview_max_duration: 30.0,
            work_dir: PathBuf::from("/tmp/vshorts"),
            output_dir: PathBuf::from("processed_shorts"),
            events_dir: PathBuf::from("."),
            transcript_languages: vec!["ru".to_string(), "en".to_string()],
            transcript_retries: 2,
            prompt_file: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            extraction: ExtractionConfig {
                concurrency_limit: std::env::var("VSHORTS_CONCURRENCY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                batch_size: std::env::var("VSHORTS_BATCH_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                batch_pacing: Duration::from_millis(
                    std::env::var("VSHORTS_BATCH_PACING_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(100),
                ),
                inference_timeout: Duration::from_secs(
                    std::env::var("VSHORTS_INFERENCE_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(120),
                ),
                max_chunk_length: std::env::var("VSHORTS_MAX_CHUNK_LENGTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            },
            banned_phrases: std::env::var("VSHORTS_BANNED_PHRASES")
                .ok()
                .map(|s| parse_list(&s))
                .unwrap_or(defaults.banned_phrases),
            max_clip_duration: std::env::var("VSHORTS_MAX_CLIP_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60.0),
            preview_max_duration: std::env::var("VSHORTS_PREVIEW_MAX_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30.0),
            work_dir: std::env::var("VSHORTS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("VSHORTS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            events_dir: std::env::var("VSHORTS_EVENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.events_dir),
            transcript_languages: std::env::var("VSHORTS_TRANSCRIPT_LANGS")
                .ok()
                .map(|s| parse_list(&s))
                .filter(|langs| !langs.is_empty())
                .unwrap_or(defaults.transcript_languages),
            transcript_retries: std::env::var("VSHORTS_TRANSCRIPT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            prompt_file: std::env::var("VSHORTS_PROMPT_FILE").ok().map(PathBuf::from),
        }
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> PipelineResult<()> {
        self.extraction.validate()?;

        if !(self.max_clip_duration.is_finite() && self.max_clip_duration > 0.0) {
            return Err(PipelineError::invalid_input("max clip duration must be positive"));
        }
        if !(self.preview_max_duration.is_finite() && self.preview_max_duration > 0.0) {
            return Err(PipelineError::invalid_input("preview max duration must be positive"));
        }
        Ok(())
    }
}

/// Split a comma-separated list, dropping blank entries.
fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.concurrency_limit, 2);
        assert_eq!(config.extraction.batch_size, 2);
        assert_eq!(config.extraction.batch_pacing, Duration::from_millis(100));
        assert_eq!(config.extraction.max_chunk_length, 2000);
        assert_eq!(config.max_clip_duration, 60.0);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = PipelineConfig::default();
        config.extraction.concurrency_limit = 0;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidInput(_))));

        let mut config = PipelineConfig::default();
        config.extraction.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.max_clip_duration = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.preview_max_duration = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" promo , ,Sponsor,"), vec!["promo", "Sponsor"]);
        assert!(parse_list("").is_empty());
    }
}
