//! Video download using yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Format selector preferring mp4 video with m4a audio.
const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Download a video from URL using yt-dlp.
///
/// An existing non-empty file at `output_path` is reused.
pub async fn download_video(url: &str, output_path: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let output_path = output_path.as_ref();

    if let Ok(metadata) = tokio::fs::metadata(output_path).await {
        if metadata.len() > 0 {
            info!("Using existing video file: {}", output_path.display());
            return Ok(output_path.to_path_buf());
        }
        tokio::fs::remove_file(output_path).await?;
    }

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!("Downloading video from {} to {}", url, output_path.display());

    let output = Command::new("yt-dlp")
        .args([
            "--no-playlist",
            "--merge-output-format",
            "mp4",
            "-f",
            FORMAT_SELECTOR,
            "-o",
        ])
        .arg(output_path)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);

        let error_msg = stderr.lines().last().unwrap_or("Unknown error");
        if is_rate_limited(&stderr) {
            warn!(url = %url, "YouTube rate limit detected");
        }

        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            error_msg
        )));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("Output file not created"));
    }

    let file_size = output_path.metadata()?.len();
    info!(
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded video successfully"
    );

    Ok(output_path.to_path_buf())
}

fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}
