//! External collaborators of the pipeline and their default adapters.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;
use vshorts_inference::PopularityClient;
use vshorts_media::{FfmpegRunner, RenderSettings};
use vshorts_models::{sanitize_output_name, Interval, PopularitySegment, VideoRef};

use crate::cancel::CancelSignal;
use crate::error::{PipelineError, PipelineResult};

/// Fetches the source video.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoDownloader: Send + Sync {
    /// Download `video` into `dir` and return the local file.
    async fn download(&self, video: &VideoRef, dir: &Path) -> PipelineResult<PathBuf>;
}

/// Produces audio-level popularity hints for a video file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze(&self, video_file: &Path) -> PipelineResult<Vec<PopularitySegment>>;
}

/// Cuts one normalized vertical clip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Cut `[start, end]` seconds of `source` into `output_name` and return
    /// the written path. The name is sanitized by the implementation.
    async fn cut(
        &self,
        source: &Path,
        output_name: &str,
        start: f64,
        end: f64,
    ) -> PipelineResult<PathBuf>;
}

/// yt-dlp backed downloader writing `<dir>/<video_id>.mp4`.
#[derive(Debug, Clone, Default)]
pub struct YtDlpDownloader;

#[async_trait]
impl VideoDownloader for YtDlpDownloader {
    async fn download(&self, video: &VideoRef, dir: &Path) -> PipelineResult<PathBuf> {
        let output = dir.join(format!("{}.mp4", video.id));
        vshorts_media::download_video(&video.url, &output)
            .await
            .map_err(|e| PipelineError::download_failed(e.to_string()))
    }
}

/// Extracts the audio track with ffmpeg and asks the popularity service
/// about it.
///
/// A failed extraction is an error; a failed service call yields no hints.
pub struct PopularityAudioAnalyzer {
    client: PopularityClient,
    work_dir: PathBuf,
    runner: FfmpegRunner,
}

impl PopularityAudioAnalyzer {
    pub fn new(client: PopularityClient, work_dir: impl AsRef<Path>) -> Self {
        Self {
            client,
            work_dir: work_dir.as_ref().to_path_buf(),
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: &CancelSignal) -> Self {
        self.runner = self.runner.with_cancel(cancel.receiver());
        self
    }
}

#[async_trait]
impl AudioAnalyzer for PopularityAudioAnalyzer {
    async fn analyze(&self, video_file: &Path) -> PipelineResult<Vec<PopularitySegment>> {
        let stem = video_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let audio_path = self.work_dir.join(format!("{}.wav", stem));

        vshorts_media::extract_audio(video_file, &audio_path, &self.runner)
            .await
            .map_err(|e| match e {
                vshorts_media::MediaError::Cancelled => PipelineError::Cancelled,
                other => PipelineError::audio_failed(other.to_string()),
            })?;

        let hints = self.client.analyze_or_empty(&audio_path).await;
        info!(hints = hints.len(), "Audio popularity analysis finished");
        Ok(hints)
    }
}

/// ffmpeg backed renderer producing 1080x1920 shorts in `output_dir`.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    output_dir: PathBuf,
    settings: RenderSettings,
    runner: FfmpegRunner,
}

impl FfmpegRenderer {
    pub fn new(output_dir: impl AsRef<Path>, settings: RenderSettings) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            settings,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: &CancelSignal) -> Self {
        self.runner = self.runner.with_cancel(cancel.receiver());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn cut(
        &self,
        source: &Path,
        output_name: &str,
        start: f64,
        end: f64,
    ) -> PipelineResult<PathBuf> {
        let output = self.output_dir.join(sanitize_output_name(output_name));
        let (path, _) = vshorts_media::render_short(
            source,
            &output,
            Interval::new(start, end),
            &self.settings,
            &self.runner,
        )
        .await?;
        Ok(path)
    }
}
