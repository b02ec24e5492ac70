//! Audio track extraction.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample rate used for speech analysis input.
pub const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Extract a mono 16 kHz WAV track from `video` into `output`.
pub async fn extract_audio(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    let video = video.as_ref();
    let output = output.as_ref();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let cmd = audio_command(video, output);
    runner.run(&cmd).await?;

    info!(
        video = %video.display(),
        audio = %output.display(),
        "Extracted audio track"
    );

    Ok(output.to_path_buf())
}

fn audio_command(video: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video, output)
        .no_video()
        .audio_channels(1)
        .audio_sample_rate(ANALYSIS_SAMPLE_RATE)
        .audio_codec("pcm_s16le")
}
