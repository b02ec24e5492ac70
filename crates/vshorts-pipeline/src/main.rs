//! vshorts command-line binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vshorts_inference::{
    PopularityClient, PopularityClientConfig, ProcessInferenceClient, PromptBuilder,
};
use vshorts_media::RenderSettings;
use vshorts_models::VideoRef;
use vshorts_pipeline::{
    cancel, AudioAnalyzer, BatchExtractor, CancelSignal, Collaborators, ContentFilter,
    ExtractionEngine, FfmpegRenderer, FileTranscriptSource, JsonFileEventSink, PipelineConfig,
    PipelineOrchestrator, PopularityAudioAnalyzer, PreviewService, TranscriptSaver,
    TranscriptSource, VideoDownloader, YtDlpDownloader, YtDlpTranscriptSource,
};

#[derive(Parser, Debug)]
#[command(name = "vshorts")]
#[command(about = "Cut vertical shorts from long videos")]
struct Cli {
    /// Load transcripts from `<dir>/<video_id>.txt` instead of downloading subtitles
    #[arg(long = "transcripts", global = true)]
    transcripts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for one video
    Run {
        /// Video URL or id
        video: String,
    },
    /// Cut a single preview clip
    Preview {
        video: String,

        /// Cut the opening window without inference
        #[arg(long = "static", default_value_t = false)]
        static_only: bool,
    },
    /// Extract timecodes from a transcript file or a directory of them
    Extract { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    config.validate()?;
    info!("Pipeline config: {:?}", config);

    if let Some(port) = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match vshorts_pipeline::metrics::init_metrics(addr) {
            Ok(()) => info!("Metrics listening on {}", addr),
            Err(e) => warn!("Failed to start metrics exporter: {}", e),
        }
    }

    let (handle, signal) = cancel::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal, cancelling run");
        handle.cancel();
    });

    let engine = Arc::new(build_engine(&config).await?);
    let transcripts = build_transcripts(&config, cli.transcripts_dir.as_deref());

    match cli.command {
        Command::Run { video } => run(config, engine, transcripts, &video, &signal).await,
        Command::Preview { video, static_only } => {
            preview(config, engine, transcripts, &video, static_only, &signal).await
        }
        Command::Extract { path } => extract(&config, engine, &path, &signal).await,
    }
}

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vshorts=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn build_engine(config: &PipelineConfig) -> Result<ExtractionEngine> {
    let prompts = match &config.prompt_file {
        Some(path) => PromptBuilder::from_file(path)
            .await
            .with_context(|| format!("Failed to load prompt template {}", path.display()))?,
        None => PromptBuilder::default(),
    };

    let client = ProcessInferenceClient::from_env();
    info!("Inference runtime: {:?}", client.config());

    Ok(ExtractionEngine::new(
        Arc::new(client),
        prompts,
        config.extraction.clone(),
    )?)
}

fn build_transcripts(config: &PipelineConfig, dir: Option<&Path>) -> Arc<dyn TranscriptSource> {
    match dir {
        Some(dir) => Arc::new(FileTranscriptSource::new(dir)),
        None => Arc::new(
            YtDlpTranscriptSource::new(&config.work_dir, config.transcript_languages.clone())
                .with_saver(TranscriptSaver::new(config.work_dir.join("transcripts"))),
        ),
    }
}

fn build_renderer(config: &PipelineConfig, signal: &CancelSignal) -> FfmpegRenderer {
    FfmpegRenderer::new(
        &config.output_dir,
        RenderSettings::default().with_max_duration(config.max_clip_duration),
    )
    .with_cancel(signal)
}

fn build_audio(config: &PipelineConfig, signal: &CancelSignal) -> Result<Option<Arc<dyn AudioAnalyzer>>> {
    let Some(popularity) = PopularityClientConfig::from_env() else {
        info!("POPULARITY_API_URL not set, skipping audio analysis");
        return Ok(None);
    };

    let client = PopularityClient::new(popularity)?;
    let analyzer = PopularityAudioAnalyzer::new(client, &config.work_dir).with_cancel(signal);
    Ok(Some(Arc::new(analyzer)))
}

async fn run(
    config: PipelineConfig,
    engine: Arc<ExtractionEngine>,
    transcripts: Arc<dyn TranscriptSource>,
    input: &str,
    signal: &CancelSignal,
) -> Result<()> {
    let video = VideoRef::parse(input)?;

    let collaborators = Collaborators {
        downloader: Arc::new(YtDlpDownloader),
        audio: build_audio(&config, signal)?,
        transcripts,
        renderer: Arc::new(build_renderer(&config, signal)),
        event_sink: Some(Arc::new(JsonFileEventSink::new(&config.events_dir))),
    };
    let orchestrator = PipelineOrchestrator::new(config, engine, collaborators)?;

    let report = orchestrator.run(&video, signal).await;
    if let Some(failure) = &report.failure {
        error!("Run aborted at {}: {}", failure.stage, failure.reason);
        std::process::exit(1);
    }

    if report.outputs.is_empty() {
        println!("No interesting moments found in {}", video.id);
    }
    for path in &report.outputs {
        println!("{}", path.display());
    }
    Ok(())
}

async fn preview(
    config: PipelineConfig,
    engine: Arc<ExtractionEngine>,
    transcripts: Arc<dyn TranscriptSource>,
    input: &str,
    static_only: bool,
    signal: &CancelSignal,
) -> Result<()> {
    let video = VideoRef::parse(input)?;

    let work_dir = config.work_dir.join(video.id.as_str());
    tokio::fs::create_dir_all(&work_dir).await?;
    let source = YtDlpDownloader.download(&video, &work_dir).await?;

    let mut service = PreviewService::new(
        transcripts,
        engine,
        Arc::new(build_renderer(&config, signal)),
        config.preview_max_duration,
    );
    if static_only {
        service = service.static_only();
    }

    match service.create_preview(&source, &video, signal).await {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => {
            error!("Failed to create preview for {}", video.id);
            std::process::exit(1);
        }
    }
}

async fn extract(
    config: &PipelineConfig,
    engine: Arc<ExtractionEngine>,
    path: &Path,
    signal: &CancelSignal,
) -> Result<()> {
    let extractor = BatchExtractor::new(engine, ContentFilter::new(&config.banned_phrases));

    let written = if path.is_dir() {
        extractor.extract_directory(path, signal).await?
    } else {
        vec![extractor.extract_file(path, signal).await?]
    };

    for output in written {
        println!("{}", output.display());
    }
    Ok(())
}
