//! Video-to-shorts pipeline.
//!
//! Chunks a transcript, fans the chunks out to a local inference runtime
//! under a concurrency bound, parses and filters the returned timecodes and
//! renders vertical shorts for the survivors.

pub mod batch;
pub mod cancel;
pub mod chunker;
pub mod config;
pub mod error;
pub mod events;
pub mod extraction;
pub mod filter;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod parser;
pub mod preview;
pub mod retry;
pub mod selector;
pub mod stages;
pub mod subtitles;
pub mod transcript;

pub use batch::BatchExtractor;
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{ExtractionConfig, PipelineConfig, DEFAULT_BANNED_PHRASES};
pub use error::{PipelineError, PipelineResult};
pub use events::{EventLog, EventSink, JsonFileEventSink, StageTimer};
pub use extraction::{ExtractionEngine, ExtractionOutcome, ExtractionState, ExtractionStats};
pub use filter::ContentFilter;
pub use logging::RunLogger;
pub use orchestrator::{
    Collaborators, PipelineOrchestrator, PipelineReport, PipelineState, StageFailure,
};
pub use parser::ParseReport;
pub use preview::PreviewService;
pub use retry::{retry_async, RetryConfig};
pub use stages::{
    AudioAnalyzer, FfmpegRenderer, PopularityAudioAnalyzer, Renderer, VideoDownloader,
    YtDlpDownloader,
};
pub use subtitles::YtDlpTranscriptSource;
pub use transcript::{
    fetch_with_retry, FileTranscriptSource, TranscriptError, TranscriptSaver, TranscriptSegment,
    TranscriptSource,
};
