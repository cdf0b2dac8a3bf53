//! `brushscan` -- batch brush-contact detection over a folder of videos.
//!
//! Preprocesses each video to 1 fps with burned-in frame labels, asks the
//! remote vision model for the first full-contact frame per mouse, and
//! writes `result.json` (plus an optional highlighted visualization) per
//! video. Exits non-zero when any video failed.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default   | Description                          |
//! |-----------------------------|----------|-----------|--------------------------------------|
//! | `GEMINI_API_KEY`            | yes      | --        | Credential for the Gemini API        |
//! | `GEMINI_API_BASE_URL`       | no       | Google    | Service root override                |
//! | `BRUSHSCAN_FFMPEG`          | no       | `ffmpeg`  | Path to the ffmpeg binary            |
//! | `BRUSHSCAN_FFPROBE`         | no       | `ffprobe` | Path to the ffprobe binary           |
//! | `BRUSHSCAN_MAX_ATTEMPTS`    | no       | `5`       | Attempts per remote call             |
//! | `BRUSHSCAN_RETRY_BASE_SECS` | no       | `5`       | First backoff delay                  |
//! | `BRUSHSCAN_RETRY_MAX_SECS`  | no       | `60`      | Backoff delay cap                    |
//! | `RUST_LOG`                  | no       | info      | Log filter                           |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brushscan_core::ffmpeg::FfmpegProcessor;
use brushscan_core::media::MediaProcessor;
use brushscan_gemini::api::GeminiApi;
use brushscan_gemini::backoff::RetryPolicy;
use brushscan_gemini::client::DetectionClient;
use brushscan_gemini::config::GeminiConfig;
use brushscan_gemini::detector::GeminiDetector;
use brushscan_pipeline::discovery::{discover_videos, plan_jobs};
use brushscan_pipeline::job::JobPipeline;
use brushscan_pipeline::preprocess::MediaPreprocessor;
use brushscan_pipeline::render::VisualizationRenderer;
use brushscan_pipeline::scheduler::BatchScheduler;
use brushscan_worker::cli::Args;

const DEFAULT_LOG_FILTER: &str =
    "brushscan=info,brushscan_worker=info,brushscan_pipeline=info,brushscan_gemini=info,brushscan_core=info";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Batch aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let gemini = GeminiConfig::from_env()?;
    let config = Arc::new(args.to_config());
    config.validate()?;

    let videos = discover_videos(&args.input_dir).await?;
    let jobs = plan_jobs(&videos, &config.output_dir);
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("cannot create {}", config.output_dir.display()))?;

    let policy = RetryPolicy::from_env();
    tracing::info!(
        input_dir = %args.input_dir.display(),
        output_dir = %config.output_dir.display(),
        videos = jobs.len(),
        model = %config.model,
        temperature = config.temperature,
        visualize = config.visualize,
        workers = config.workers,
        max_attempts = policy.max_attempts,
        "Starting brushscan",
    );

    let media: Arc<dyn MediaProcessor> = Arc::new(FfmpegProcessor::from_env());
    let detector = GeminiDetector::new(GeminiApi::new(gemini).context("cannot build HTTP client")?);
    let pipeline = Arc::new(JobPipeline::new(
        Arc::clone(&config),
        MediaPreprocessor::new(Arc::clone(&media)),
        DetectionClient::new(Arc::new(detector), policy),
        VisualizationRenderer::new(media),
    ));

    let run = BatchScheduler::new(pipeline).run(jobs).await;
    print!("{}", run.summary());

    match run.write_summary(&config.output_dir).await {
        Ok(path) => tracing::info!(path = %path.display(), "Batch summary written"),
        Err(e) => tracing::warn!(error = %e, "Failed to write batch summary"),
    }

    Ok(if run.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
