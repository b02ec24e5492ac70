//! Vertical short rendering.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use vshorts_models::Interval;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::short_filter;
use crate::probe::get_duration;

/// Encoding settings for rendered shorts.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    /// Maximum clip length in seconds
    pub max_duration: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "fast".to_string(),
            max_duration: 60.0,
        }
    }
}

impl RenderSettings {
    pub fn with_max_duration(mut self, max_duration: f64) -> Self {
        self.max_duration = max_duration;
        self
    }
}

/// Clamp a requested interval to the maximum length and, when known, the
/// source duration.
pub fn plan_cut(
    requested: Interval,
    max_duration: f64,
    source_duration: Option<f64>,
) -> MediaResult<Interval> {
    let mut cut = requested.capped(max_duration);

    if let Some(total) = source_duration.filter(|d| *d > 0.0) {
        if cut.start >= total {
            return Err(MediaError::invalid_interval(format!(
                "start {:.3}s is past the end of the source ({:.3}s)",
                cut.start, total
            )));
        }
        cut.end = cut.end.min(total);
    }

    if cut.end <= cut.start {
        return Err(MediaError::invalid_interval(format!(
            "empty interval {:.3}-{:.3}",
            cut.start, cut.end
        )));
    }

    Ok(cut)
}

/// Render one vertical short from `source` into `output`.
///
/// Returns the interval actually cut.
pub async fn render_short(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    requested: Interval,
    settings: &RenderSettings,
    runner: &FfmpegRunner,
) -> MediaResult<(PathBuf, Interval)> {
    let source = source.as_ref();
    let output = output.as_ref();

    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    let source_duration = match get_duration(source).await {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(source = %source.display(), error = %e, "Could not probe source duration");
            None
        }
    };

    let cut = plan_cut(requested, settings.max_duration, source_duration)?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(
        "Rendering short: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        source.display(),
        output.display(),
        cut.start,
        cut.duration()
    );

    let cmd = short_command(source, output, cut, settings);
    runner.run(&cmd).await?;

    Ok((output.to_path_buf(), cut))
}

fn short_command(
    source: &Path,
    output: &Path,
    cut: Interval,
    settings: &RenderSettings,
) -> FfmpegCommand {
    FfmpegCommand::new(source, output)
        .seek(cut.start)
        .duration(cut.duration())
        .video_filter(short_filter())
        .video_codec(settings.video_codec.clone())
        .preset(settings.preset.clone())
        .audio_codec(settings.audio_codec.clone())
        .faststart()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_cut_caps_to_max_duration() {
        let cut = plan_cut(Interval::new(10.0, 200.0), 60.0, None).unwrap();
        assert_eq!(cut, Interval::new(10.0, 70.0));
    }

    #[test]
    fn test_plan_cut_clamps_to_source() {
        let cut = plan_cut(Interval::new(100.0, 150.0), 60.0, Some(120.0)).unwrap();
        assert_eq!(cut, Interval::new(100.0, 120.0));
    }

    #[test]
    fn test_plan_cut_rejects_start_past_end() {
        let err = plan_cut(Interval::new(130.0, 150.0), 60.0, Some(120.0)).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInterval(_)));
    }

    #[test]
    fn test_plan_cut_rejects_empty_interval() {
        assert!(plan_cut(Interval::new(20.0, 20.0), 60.0, None).is_err());
    }

    #[test]
    fn test_short_command_arguments() {
        let args = short_command(
            Path::new("src.mp4"),
            Path::new("short.mp4"),
            Interval::new(5.0, 35.0),
            &RenderSettings::default(),
        )
        .build_args();

        assert!(args.windows(2).any(|w| w == ["-ss", "5.000"]));
        assert!(args.windows(2).any(|w| w == ["-t", "30.000"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "fast"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.windows(2).any(|w| w == ["-movflags", "+faststart"]));
    }

    #[tokio::test]
    async fn test_render_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_short(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            Interval::new(0.0, 10.0),
            &RenderSettings::default(),
            &FfmpegRunner::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_missing_input());
    }
}
