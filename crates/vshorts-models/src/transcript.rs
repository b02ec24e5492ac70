//! Transcript models.

use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// Full transcript text for one video. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    video_id: VideoId,
    text: String,
}

impl Transcript {
    pub fn new(video_id: VideoId, text: impl Into<String>) -> Self {
        Self {
            video_id,
            text: text.into(),
        }
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A contiguous, non-overlapping slice of a transcript.
///
/// `index` is the zero-based position of the chunk within its transcript and
/// is used to restore ordering after concurrent extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub index: usize,
    pub text: String,
}

impl TranscriptChunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
