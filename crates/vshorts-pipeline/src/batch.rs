//! Offline timecode extraction over transcript files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::cancel::CancelSignal;
use crate::error::{PipelineError, PipelineResult};
use crate::events::EventLog;
use crate::extraction::ExtractionEngine;
use crate::filter::ContentFilter;

const OUTPUT_SUFFIX: &str = "_timecodes.json";

/// Runs extraction and filtering over `*.txt` transcripts, writing
/// `<name>_timecodes.json` next to each input.
pub struct BatchExtractor {
    engine: Arc<ExtractionEngine>,
    filter: ContentFilter,
}

impl BatchExtractor {
    pub fn new(engine: Arc<ExtractionEngine>, filter: ContentFilter) -> Self {
        Self { engine, filter }
    }

    /// Output path for a transcript file.
    pub fn output_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        input.with_file_name(format!("{}{}", stem, OUTPUT_SUFFIX))
    }

    /// Extract one transcript file and return the written JSON path.
    pub async fn extract_file(&self, input: &Path, cancel: &CancelSignal) -> PipelineResult<PathBuf> {
        let text = tokio::fs::read_to_string(input).await?;
        let outcome = self
            .engine
            .extract(&text, &[], &EventLog::new(), cancel)
            .await?;
        let timecodes = self.filter.filter(outcome.timecodes);

        let output = Self::output_path(input);
        tokio::fs::write(&output, serde_json::to_vec_pretty(&timecodes)?).await?;

        info!(
            input = %input.display(),
            output = %output.display(),
            timecodes = timecodes.len(),
            "Saved timecodes"
        );
        Ok(output)
    }

    /// Extract every `*.txt` file of `dir`, in name order.
    ///
    /// Per-file failures are logged and skipped; cancellation stops the batch.
    pub async fn extract_directory(
        &self,
        dir: &Path,
        cancel: &CancelSignal,
    ) -> PipelineResult<Vec<PathBuf>> {
        let mut inputs = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") && path.is_file() {
                inputs.push(path);
            }
        }
        inputs.sort();

        info!(dir = %dir.display(), files = inputs.len(), "Extracting transcripts");

        let mut written = Vec::with_capacity(inputs.len());
        for input in inputs {
            match self.extract_file(&input, cancel).await {
                Ok(output) => written.push(output),
                Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => warn!(input = %input.display(), error = %e, "Skipping transcript"),
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use async_trait::async_trait;
    use std::time::Duration;
    use vshorts_inference::{InferenceClient, InferenceResult, PromptBuilder};
    use vshorts_models::Timecode;

    struct FixedClient(&'static str);

    #[async_trait]
    impl InferenceClient for FixedClient {
        async fn infer(&self, _prompt: &str, _timeout: Duration) -> InferenceResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn extractor(response: &'static str) -> BatchExtractor {
        let engine = ExtractionEngine::new(
            Arc::new(FixedClient(response)),
            PromptBuilder::default(),
            ExtractionConfig::default(),
        )
        .unwrap();
        BatchExtractor::new(Arc::new(engine), ContentFilter::new(["sponsor"]))
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            BatchExtractor::output_path(Path::new("/data/abc_20240101_ru.txt")),
            PathBuf::from("/data/abc_20240101_ru_timecodes.json")
        );
    }

    #[tokio::test]
    async fn test_extract_directory_writes_json() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.txt"), "second transcript").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "first transcript").unwrap();
        std::fs::write(tmp.path().join("notes.md"), "ignored").unwrap();

        let extractor = extractor("00:00 - 00:10 Hook\n00:10 - 00:20 Our sponsor today");
        let written = extractor
            .extract_directory(tmp.path(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(
            written,
            vec![
                tmp.path().join("a_timecodes.json"),
                tmp.path().join("b_timecodes.json"),
            ]
        );

        let saved: Vec<Timecode> =
            serde_json::from_slice(&std::fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(saved, vec![Timecode::new("00:00", "00:10", "Hook")]);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let extractor = extractor("");
        let result = extractor
            .extract_file(Path::new("/nonexistent/x.txt"), &CancelSignal::never())
            .await;
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
