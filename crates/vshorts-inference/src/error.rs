//! Inference client error types.

use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Failed to spawn inference process '{program}': {source}")]
    ProcessSpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Inference process exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InferenceError {
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessSpawnFailure {
            program: program.into(),
            source,
        }
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Timeout { .. } => "timeout",
            InferenceError::ProcessSpawnFailure { .. } => "spawn_failure",
            InferenceError::NonZeroExit { .. } => "non_zero_exit",
            InferenceError::RequestFailed(_) => "request_failed",
            InferenceError::Io(_) => "io",
            InferenceError::Network(_) => "network",
            InferenceError::Json(_) => "json",
        }
    }
}
