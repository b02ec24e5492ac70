//! Transcript source backed by yt-dlp subtitle downloads.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};
use vshorts_models::{format_seconds, parse_timestamp, Transcript, VideoRef};

use crate::transcript::{TranscriptError, TranscriptSaver, TranscriptSegment, TranscriptSource};

fn cue_timing() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^((?:\d{2}:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d{2}:)?\d{2}:\d{2}\.\d{3})")
            .expect("cue timing pattern is valid")
    })
}

fn markup_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

/// Downloads VTT subtitles (manual or automatic) with yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpTranscriptSource {
    work_dir: PathBuf,
    languages: Vec<String>,
    saver: Option<TranscriptSaver>,
}

impl YtDlpTranscriptSource {
    pub fn new(work_dir: impl AsRef<Path>, languages: Vec<String>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            languages,
            saver: None,
        }
    }

    /// Persist every fetched transcript.
    pub fn with_saver(mut self, saver: TranscriptSaver) -> Self {
        self.saver = Some(saver);
        self
    }

    async fn download_subtitles(&self, video: &VideoRef, dir: &Path) -> Result<(), TranscriptError> {
        which::which("yt-dlp")
            .map_err(|_| TranscriptError::unavailable("yt-dlp not found in PATH"))?;

        let output_template = dir.join("%(id)s");
        let languages = self.languages.join(",");
        let output = Command::new("yt-dlp")
            .args([
                "--write-auto-sub",
                "--write-sub",
                "--sub-lang",
                languages.as_str(),
                "--skip-download",
                "--sub-format",
                "vtt",
                "--output",
            ])
            .arg(&output_template)
            .arg(&video.url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        Err(classify_failure(&video.id.to_string(), &stderr))
    }

    /// VTT files in `dir`, ordered by configured language preference.
    async fn find_subtitles(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>, TranscriptError> {
        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("vtt") {
                continue;
            }
            let lang = subtitle_language(&path).unwrap_or_default();
            found.push((path, lang));
        }

        found.sort_by_key(|(path, lang)| {
            let rank = self
                .languages
                .iter()
                .position(|l| lang == l || lang.starts_with(&format!("{}-", l)))
                .unwrap_or(self.languages.len());
            (rank, path.clone())
        });
        Ok(found)
    }
}

#[async_trait]
impl TranscriptSource for YtDlpTranscriptSource {
    async fn get(&self, video: &VideoRef) -> Result<Transcript, TranscriptError> {
        let dir = self.work_dir.join(video.id.as_str()).join("subtitles");
        tokio::fs::create_dir_all(&dir).await?;

        info!(video_id = %video.id, "Fetching subtitles with yt-dlp");
        self.download_subtitles(video, &dir).await?;

        let files = self.find_subtitles(&dir).await?;
        let Some((path, lang)) = files.first() else {
            return Err(TranscriptError::disabled(format!(
                "no subtitles in languages [{}] for {}",
                self.languages.join(","),
                video.id
            )));
        };

        let content = tokio::fs::read_to_string(path).await?;
        let segments = parse_vtt(&content);
        let transcript = Transcript::new(video.id.clone(), render_transcript(&segments));

        if let Some(saver) = &self.saver {
            saver.save_or_warn(&transcript, lang, &segments).await;
        }

        for (path, _) in &files {
            tokio::fs::remove_file(path).await.ok();
        }

        info!(
            video_id = %video.id,
            lang = %lang,
            segments = segments.len(),
            "Fetched transcript"
        );
        Ok(transcript)
    }
}

fn classify_failure(video_id: &str, stderr: &str) -> TranscriptError {
    let lower = stderr.to_lowercase();
    if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
    {
        return TranscriptError::not_found(video_id.to_string());
    }

    let last_line = stderr.lines().last().unwrap_or("unknown error");
    TranscriptError::unavailable(format!("yt-dlp failed: {}", last_line))
}

/// `<id>.<lang>.vtt` → `<lang>`.
fn subtitle_language(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit_once('.').map(|(_, lang)| lang.to_string())
}

/// Parse VTT cues into de-duplicated caption segments.
///
/// Markup tags are stripped, cue numbers and headers skipped, and rolling
/// captions that repeat the previous line are dropped.
pub fn parse_vtt(content: &str) -> Vec<TranscriptSegment> {
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut current: Option<(f64, f64)> = None;
    let mut last_text = String::new();

    let mut lines = content.lines().map(str::trim).peekable();
    while let Some(line) = lines.next() {
        if let Some(caps) = cue_timing().captures(line) {
            current = match (parse_timestamp(&caps[1]), parse_timestamp(&caps[2])) {
                (Ok(start), Ok(end)) => Some((start, end)),
                _ => None,
            };
            continue;
        }

        let Some((start, end)) = current else {
            continue;
        };

        // A cue number is a digit-only line directly above a timing line.
        let is_cue_number = line.chars().all(|c| c.is_ascii_digit())
            && lines.peek().is_some_and(|next| cue_timing().is_match(next));
        if is_cue_number {
            continue;
        }

        let text = markup_tag().replace_all(line, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        if text != last_text {
            segments.push(TranscriptSegment {
                start,
                end,
                text: text.to_string(),
            });
            last_text = text.to_string();
        }
    }

    segments
}

/// Render segments as `[HH:MM:SS] text` lines.
pub fn render_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| {
            let clock = format_seconds(s.start.floor());
            format!("[{}] {}\n", clock, s.text)
        })
        .collect()
}
