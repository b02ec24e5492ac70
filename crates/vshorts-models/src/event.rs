//! Pipeline telemetry events.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Downloading,
    ExtractingAudio,
    Transcribing,
    ExtractingTimecodes,
    Filtering,
    Rendering,
    /// A single inference call inside the extraction stage.
    Inference,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Downloading => "downloading",
            Stage::ExtractingAudio => "extracting_audio",
            Stage::Transcribing => "transcribing",
            Stage::ExtractingTimecodes => "extracting_timecodes",
            Stage::Filtering => "filtering",
            Stage::Rendering => "rendering",
            Stage::Inference => "inference",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineEvent {
    /// Wall-clock time the stage started.
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub duration_sec: f64,
    /// Free-form detail (chunk index, failure reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PipelineEvent {
    pub fn new(timestamp: DateTime<Utc>, stage: Stage, duration: Duration) -> Self {
        Self {
            timestamp,
            stage,
            duration_sec: duration.as_secs_f64(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
