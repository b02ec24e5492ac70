//! Concurrency, timeout and cancellation behaviour of the extraction engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use vshorts_inference::{
    InferenceClient, InferenceResult, ProcessClientConfig, ProcessInferenceClient, PromptBuilder,
};
use vshorts_models::Stage;
use vshorts_pipeline::{
    cancel, CancelSignal, EventLog, ExtractionConfig, ExtractionEngine, ExtractionState,
    PipelineError,
};

/// Records the highest number of overlapping calls.
#[derive(Default)]
struct TrackingClient {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl InferenceClient for TrackingClient {
    async fn infer(&self, _prompt: &str, _timeout: Duration) -> InferenceResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("00:00 - 00:10 Moment".to_string())
    }
}

/// Hangs on chunks containing `ZZZZ`, answers the rest immediately.
struct SlowOnMarker;

#[async_trait]
impl InferenceClient for SlowOnMarker {
    async fn infer(&self, prompt: &str, _timeout: Duration) -> InferenceResult<String> {
        if prompt.contains("ZZZZ") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok("00:05 - 00:20 Fast answer".to_string())
    }
}

struct Hanging;

#[async_trait]
impl InferenceClient for Hanging {
    async fn infer(&self, _prompt: &str, _timeout: Duration) -> InferenceResult<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(String::new())
    }
}

/// Counts warnings emitted by the workspace crates.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::WARN && meta.target().starts_with("vshorts") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Collect warnings on this thread until the guard drops.
fn count_warnings() -> (Arc<AtomicUsize>, DefaultGuard) {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
    (count, tracing::subscriber::set_default(subscriber))
}

fn config(max_chunk_length: usize) -> ExtractionConfig {
    ExtractionConfig {
        max_chunk_length,
        batch_pacing: Duration::from_millis(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_in_flight_calls_never_exceed_limit() {
    let client = Arc::new(TrackingClient::default());
    let engine = ExtractionEngine::new(
        client.clone(),
        PromptBuilder::default(),
        ExtractionConfig {
            concurrency_limit: 2,
            batch_size: 4,
            ..config(4)
        },
    )
    .unwrap();

    let outcome = engine
        .extract(&"x".repeat(32), &[], &EventLog::new(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.stats.chunks, 8);
    assert_eq!(outcome.timecodes.len(), 8);
    assert_eq!(client.calls.load(Ordering::SeqCst), 8);
    assert!(client.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_timed_out_call_only_drops_its_chunk() {
    let engine = ExtractionEngine::new(
        Arc::new(SlowOnMarker),
        PromptBuilder::with_template("{transcript}"),
        ExtractionConfig {
            inference_timeout: Duration::from_millis(100),
            ..config(4)
        },
    )
    .unwrap();

    let (warnings, _guard) = count_warnings();
    let events = EventLog::new();
    let started = Instant::now();
    let outcome = engine
        .extract("aaaaZZZZ", &[], &events, &CancelSignal::never())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.stats.failed_chunks, 1);
    assert_eq!(outcome.timecodes.len(), 1);
    assert_eq!(outcome.timecodes[0].text, "Fast answer");

    let details: Vec<String> = events
        .snapshot()
        .into_iter()
        .filter(|e| e.stage == Stage::Inference)
        .filter_map(|e| e.detail)
        .collect();
    assert_eq!(details.len(), 2);
    assert!(details.contains(&"chunk=1 outcome=timeout".to_string()));
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_discards_results() {
    let engine = Arc::new(
        ExtractionEngine::new(Arc::new(Hanging), PromptBuilder::default(), config(4)).unwrap(),
    );
    let (handle, signal) = cancel::channel();

    let task = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .extract("aaaabbbbcccc", &[], &EventLog::new(), &signal)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let started = Instant::now();
    handle.cancel();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(engine.state(), ExtractionState::Failed);
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_client_end_to_end() {
    // `cat` echoes the prompt, so the chunk text comes back as the response.
    let client = ProcessInferenceClient::new(ProcessClientConfig::new("cat", Vec::<String>::new()));
    let engine = ExtractionEngine::new(
        Arc::new(client),
        PromptBuilder::with_template("{transcript}"),
        config(2000),
    )
    .unwrap();

    let transcript = "00:00 - 00:10 Intro\n00:10 - 00:30 Main\ngarbage line\n00:30 - 00:40 Outro";
    let outcome = engine
        .extract(transcript, &[], &EventLog::new(), &CancelSignal::never())
        .await
        .unwrap();

    let texts: Vec<_> = outcome.timecodes.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Intro", "Main", "Outro"]);
    assert_eq!(outcome.stats.ignored_lines, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_process_warns_once_per_chunk() {
    let client = ProcessInferenceClient::new(ProcessClientConfig::new(
        "sh",
        ["-c", "cat >/dev/null; exit 3"],
    ));
    let engine = ExtractionEngine::new(
        Arc::new(client),
        PromptBuilder::with_template("{transcript}"),
        config(2000),
    )
    .unwrap();

    let (warnings, _guard) = count_warnings();
    let outcome = engine
        .extract("some transcript", &[], &EventLog::new(), &CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(outcome.stats.failed_chunks, 1);
    assert!(outcome.timecodes.is_empty());
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}
