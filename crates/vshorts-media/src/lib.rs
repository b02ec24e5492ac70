//! yt-dlp and FFmpeg CLI wrappers.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Cancellation and timeout support via tokio
//! - Video download, audio extraction, probing and vertical short rendering

pub mod audio;
pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod probe;
pub mod render;

pub use audio::extract_audio;
pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::download_video;
pub use error::{MediaError, MediaResult};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use render::{plan_cut, render_short, RenderSettings};
