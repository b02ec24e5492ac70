//! Shared data models for the vshorts pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Transcripts and transcript chunks
//! - Timecodes, intervals and popularity hints
//! - Pipeline telemetry events
//! - Video references parsed from user input

pub mod event;
pub mod timecode;
pub mod timestamp;
pub mod transcript;
pub mod utils;
pub mod video;

pub use event::{PipelineEvent, Stage};
pub use timecode::{Interval, PopularitySegment, Timecode};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
pub use transcript::{Transcript, TranscriptChunk};
pub use utils::sanitize_output_name;
pub use video::{VideoId, VideoRef, VideoRefError};
