//! Video identifiers and references.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Length of a YouTube video ID.
const YOUTUBE_ID_LEN: usize = 11;

/// Identifier of a source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VideoRefError {
    #[error("Video identifier cannot be empty")]
    Empty,

    #[error("Video ID not found in URL: {0}")]
    IdNotFound(String),

    #[error("Invalid video ID: {0}")]
    InvalidId(String),
}

/// A video to process: its identifier and the URL used to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRef {
    pub id: VideoId,
    pub url: String,
}

impl VideoRef {
    /// Parse user input: a bare YouTube ID or any common YouTube URL form
    /// (`watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`, `/v/`).
    pub fn parse(input: &str) -> Result<Self, VideoRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(VideoRefError::Empty);
        }

        if is_valid_youtube_id(input) {
            return Ok(Self::from_id(input));
        }

        let url = Url::parse(input).map_err(|_| VideoRefError::InvalidId(input.to_string()))?;
        let id = youtube_id_from_url(&url)
            .ok_or_else(|| VideoRefError::IdNotFound(input.to_string()))?;

        if !is_valid_youtube_id(&id) {
            return Err(VideoRefError::InvalidId(id));
        }

        Ok(Self {
            id: VideoId(id),
            url: input.to_string(),
        })
    }

    /// Reference for a bare YouTube ID.
    pub fn from_id(id: &str) -> Self {
        Self {
            id: VideoId::from(id),
            url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}

fn youtube_id_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return url.path_segments()?.next().map(str::to_string);
    }

    if !(host == "youtube.com" || host.ends_with(".youtube.com")) {
        return None;
    }

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        return Some(v.into_owned());
    }

    let mut segments = url.path_segments()?;
    match segments.next()? {
        "shorts" | "embed" | "v" | "live" => segments.next().map(str::to_string),
        _ => None,
    }
}

fn is_valid_youtube_id(s: &str) -> bool {
    s.len() == YOUTUBE_ID_LEN
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
