//! In-memory substitutes for the media tool and the remote vision model.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use brushscan_core::media::{MediaError, MediaInfo, MediaProcessor, TranscodeRequest, OPAQUE_BOX_COLOR};
use brushscan_gemini::backoff::RetryPolicy;
use brushscan_gemini::client::DetectionClient;
use brushscan_gemini::detector::{InferenceRequest, RemoteVideo, VisionDetector, VisionError};
use brushscan_pipeline::config::PipelineConfig;
use brushscan_pipeline::job::JobPipeline;
use brushscan_pipeline::preprocess::MediaPreprocessor;
use brushscan_pipeline::render::VisualizationRenderer;

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Tracks stream facts per path and "transcodes" by writing a stub file
/// whose frame count is inherited from the input.
#[derive(Default)]
pub struct FakeMedia {
    pub infos: Mutex<HashMap<PathBuf, MediaInfo>>,
    pub requests: Mutex<Vec<TranscodeRequest>>,
    /// File names whose transcode fails.
    pub failing_inputs: HashSet<String>,
    /// Fail every visualization render.
    pub fail_visualization: bool,
    /// Lose one frame on every transcode.
    pub drop_frame: bool,
}

impl FakeMedia {
    pub fn add_source(&self, path: &Path, rate: &str, frames: u64) {
        self.infos.lock().unwrap().insert(
            path.to_path_buf(),
            MediaInfo {
                frame_rate: Some(rate.to_string()),
                frame_count: Some(frames),
            },
        );
    }

    pub fn requests(&self) -> Vec<TranscodeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaProcessor for FakeMedia {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MediaError> {
        self.infos
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| MediaError::VideoNotFound(path.display().to_string()))
    }

    async fn transcode(&self, request: &TranscodeRequest) -> Result<(), MediaError> {
        self.requests.lock().unwrap().push(request.clone());

        let is_visualization = request
            .overlay
            .as_ref()
            .is_some_and(|o| o.box_color == OPAQUE_BOX_COLOR);
        if self.failing_inputs.contains(&file_name(&request.input))
            || (is_visualization && self.fail_visualization)
        {
            // Like a real encoder killed mid-way, leave a truncated file.
            tokio::fs::write(&request.output, b"partial").await?;
            return Err(MediaError::ExecutionFailed {
                exit_code: Some(1),
                stderr: "simulated failure".into(),
            });
        }

        let input = self.probe(&request.input).await?;
        let frames = input
            .frame_count
            .map(|n| if self.drop_frame { n.saturating_sub(1) } else { n });
        let rate = request
            .output_fps
            .map(|fps| format!("{fps}/1"))
            .or(input.frame_rate);

        tokio::fs::write(&request.output, b"stub").await?;
        self.infos.lock().unwrap().insert(
            request.output.clone(),
            MediaInfo {
                frame_rate: rate,
                frame_count: frames,
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Vision
// ---------------------------------------------------------------------------

pub const DEFAULT_RESPONSE: &str = r#"{"L": 42, "R": 87, "notes": "clear contacts"}"#;

/// Answers by uploaded file name. Tracks how many inferences overlap.
#[derive(Default)]
pub struct FakeVision {
    /// Responses keyed by the uploaded (labeled) file name.
    pub responses: HashMap<String, Result<String, VisionError>>,
    /// Uploaded file names whose inference panics.
    pub panicking: HashSet<String>,
    /// Simulated inference latency.
    pub latency: Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub inferences: AtomicUsize,
}

#[async_trait]
impl VisionDetector for FakeVision {
    async fn upload(&self, video: &Path) -> Result<RemoteVideo, VisionError> {
        Ok(RemoteVideo {
            name: file_name(video),
            uri: format!("fake://{}", file_name(video)),
            mime_type: "video/mp4".into(),
        })
    }

    async fn infer(
        &self,
        video: &RemoteVideo,
        _request: &InferenceRequest,
    ) -> Result<String, VisionError> {
        self.inferences.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(&video.name) {
            panic!("simulated worker crash for {}", video.name);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.responses
            .get(&video.name)
            .cloned()
            .unwrap_or_else(|| Ok(DEFAULT_RESPONSE.to_string()))
    }

    async fn release(&self, _video: &RemoteVideo) -> Result<(), VisionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

pub fn pipeline(config: PipelineConfig, media: Arc<FakeMedia>, vision: Arc<FakeVision>) -> Arc<JobPipeline> {
    let policy = RetryPolicy::default().without_jitter();
    Arc::new(JobPipeline::new(
        Arc::new(config),
        MediaPreprocessor::new(media.clone()),
        DetectionClient::new(vision, policy),
        VisualizationRenderer::new(media),
    ))
}

/// Create an empty source video file and register its stream facts.
pub fn add_video(media: &FakeMedia, dir: &Path, name: &str, rate: &str, frames: u64) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"source").unwrap();
    media.add_source(&path, rate, frames);
    path
}

/// Names of the files directly inside `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
