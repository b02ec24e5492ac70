//! Audio popularity-analysis HTTP client.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use vshorts_models::PopularitySegment;

use crate::error::{InferenceError, InferenceResult};

/// Configuration for the popularity client.
#[derive(Debug, Clone)]
pub struct PopularityClientConfig {
    /// Analysis endpoint receiving the audio upload
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl PopularityClientConfig {
    /// Create config from environment variables.
    ///
    /// Returns `None` when `POPULARITY_API_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("POPULARITY_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            endpoint,
            api_key: std::env::var("POPULARITY_API_KEY").ok(),
            timeout: Duration::from_secs(
                std::env::var("POPULARITY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PopularityResponse {
    #[serde(default)]
    popular_segments: Vec<PopularitySegment>,
}

/// Posts an audio file to the analysis service and returns its hints.
pub struct PopularityClient {
    http: Client,
    config: PopularityClientConfig,
}

impl PopularityClient {
    pub fn new(config: PopularityClientConfig) -> InferenceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(InferenceError::Network)?;

        Ok(Self { http, config })
    }

    /// Request hints for the whole audio file.
    pub async fn analyze(&self, audio_path: &Path) -> InferenceResult<Vec<PopularitySegment>> {
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;
        let form = Form::new().part("audio", part);

        debug!("Sending audio analysis request to {}", self.config.endpoint);

        let mut request = self.http.post(&self.config.endpoint).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::request_failed(format!(
                "Popularity service returned {}: {}",
                status, body
            )));
        }

        let parsed: PopularityResponse = response.json().await?;
        Ok(parsed.popular_segments)
    }

    /// Like [`analyze`](Self::analyze), but any failure yields no hints.
    pub async fn analyze_or_empty(&self, audio_path: &Path) -> Vec<PopularitySegment> {
        match self.analyze(audio_path).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!(
                    audio = %audio_path.display(),
                    error = %e,
                    "Popularity analysis failed, continuing without hints"
                );
                Vec::new()
            }
        }
    }
}
