//! End-to-end pipeline runs against file-backed and in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vshorts_inference::{InferenceClient, InferenceResult, PromptBuilder};
use vshorts_models::{PipelineEvent, Stage, VideoRef};
use vshorts_pipeline::{
    CancelSignal, Collaborators, ExtractionEngine, FileTranscriptSource, JsonFileEventSink,
    PipelineConfig, PipelineOrchestrator, PipelineResult, PipelineState, Renderer,
    VideoDownloader,
};

struct FixedClient(&'static str);

#[async_trait]
impl InferenceClient for FixedClient {
    async fn infer(&self, _prompt: &str, _timeout: Duration) -> InferenceResult<String> {
        Ok(self.0.to_string())
    }
}

/// Writes an empty placeholder instead of downloading.
struct PlaceholderDownloader;

#[async_trait]
impl VideoDownloader for PlaceholderDownloader {
    async fn download(&self, video: &VideoRef, dir: &Path) -> PipelineResult<PathBuf> {
        let path = dir.join(format!("{}.mp4", video.id));
        tokio::fs::write(&path, b"video").await?;
        Ok(path)
    }
}

/// Remembers every requested cut.
#[derive(Default)]
struct RecordingRenderer {
    output_dir: PathBuf,
    cuts: Mutex<Vec<(String, f64, f64)>>,
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn cut(
        &self,
        source: &Path,
        output_name: &str,
        start: f64,
        end: f64,
    ) -> PipelineResult<PathBuf> {
        assert!(source.exists());
        self.cuts
            .lock()
            .unwrap()
            .push((output_name.to_string(), start, end));
        Ok(self.output_dir.join(output_name))
    }
}

fn setup(
    root: &Path,
    response: &'static str,
    renderer: Arc<RecordingRenderer>,
) -> PipelineOrchestrator {
    let transcripts_dir = root.join("transcripts");
    std::fs::create_dir_all(&transcripts_dir).unwrap();
    std::fs::write(transcripts_dir.join("abc123.txt"), "[00:00:00] hello there\n").unwrap();

    let mut config = PipelineConfig::default();
    config.work_dir = root.join("work");
    config.events_dir = root.join("events");
    config.extraction.batch_pacing = Duration::from_millis(1);

    let engine = ExtractionEngine::new(
        Arc::new(FixedClient(response)),
        PromptBuilder::default(),
        config.extraction.clone(),
    )
    .unwrap();

    let events_dir = config.events_dir.clone();
    PipelineOrchestrator::new(
        config,
        Arc::new(engine),
        Collaborators {
            downloader: Arc::new(PlaceholderDownloader),
            audio: None,
            transcripts: Arc::new(FileTranscriptSource::new(&transcripts_dir)),
            renderer,
            event_sink: Some(Arc::new(JsonFileEventSink::new(events_dir))),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_run_renders_and_persists_events() {
    let tmp = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer {
        output_dir: tmp.path().join("out"),
        ..Default::default()
    });

    let orchestrator = setup(
        tmp.path(),
        "00:03 - 00:25 The reveal\n00:40 - 00:55 Check the sponsor link\n01:10 - 01:40 Big laugh",
        renderer.clone(),
    );
    let report = orchestrator
        .run(&VideoRef::from_id("abc123"), &CancelSignal::never())
        .await;

    assert_eq!(report.final_state, PipelineState::Completed);
    assert_eq!(report.outputs.len(), 2);

    let cuts = renderer.cuts.lock().unwrap().clone();
    assert_eq!(
        cuts,
        vec![
            ("short_3-25.mp4".to_string(), 3.0, 25.0),
            ("short_70-100.mp4".to_string(), 70.0, 100.0),
        ]
    );

    let events_file = report.events_file.expect("events persisted");
    let file_name = events_file.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("pipeline_events_"));
    assert!(file_name.ends_with(".json"));

    let saved: Vec<PipelineEvent> =
        serde_json::from_slice(&std::fs::read(&events_file).unwrap()).unwrap();
    assert_eq!(saved.len(), report.events.len());
    let stages: Vec<Stage> = saved.iter().map(|e| e.stage).collect();
    assert!(stages.contains(&Stage::Downloading));
    assert!(stages.contains(&Stage::Transcribing));
    assert!(stages.contains(&Stage::Inference));
    assert!(stages.contains(&Stage::Rendering));
}

#[tokio::test]
async fn test_missing_transcript_aborts_without_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::default());
    let orchestrator = setup(tmp.path(), "00:00 - 00:10 x", renderer.clone());

    let report = orchestrator
        .run(&VideoRef::from_id("unknown"), &CancelSignal::never())
        .await;

    assert_eq!(report.final_state, PipelineState::Aborted);
    assert!(report.outputs.is_empty());
    assert_eq!(report.failure.unwrap().stage, Stage::Transcribing);
    assert!(renderer.cuts.lock().unwrap().is_empty());
    assert!(report.events_file.is_some());
}
