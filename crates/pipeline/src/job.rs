//! Per-video pipeline: an explicit state machine from discovery to persisted result.
//!
//! ```text
//! Discovered -> Preprocessing -> Preprocessed -> Detecting -> Detected
//!     -> [Visualizing -> ] Visualized -> Persisted
//! ```
//!
//! Any working state may instead move to the absorbing `Failed { stage }`.
//! A failed visualization is not a job failure: the detection result is
//! still persisted and the render error is carried alongside it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use brushscan_core::highlight::VisualizationSpec;
use brushscan_core::types::{DetectionResult, PreprocessedVideo, VideoJob};
use brushscan_gemini::client::DetectionClient;

use crate::config::PipelineConfig;
use crate::error::PersistError;
use crate::preprocess::MediaPreprocessor;
use crate::render::VisualizationRenderer;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Stage at which a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    Detecting,
    Visualizing,
    Persisting,
    /// The job's worker task itself died.
    Scheduling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preprocessing => "preprocessing",
            Stage::Detecting => "detecting",
            Stage::Visualizing => "visualizing",
            Stage::Persisting => "persisting",
            Stage::Scheduling => "scheduling",
        };
        f.write_str(name)
    }
}

/// Files written for a persisted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobArtifacts {
    pub labeled_video: PathBuf,
    pub result_json: PathBuf,
    pub visualization: Option<PathBuf>,
}

/// Final result of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Persisted {
        result: DetectionResult,
        artifacts: JobArtifacts,
        /// Set when visualization was requested but failed.
        visualization_error: Option<String>,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

impl JobOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Detection persisted but the visualization failed.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::Persisted {
                visualization_error: Some(_),
                ..
            }
        )
    }
}

/// Where a job currently is. Each variant carries what later stages need.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Discovered,
    Preprocessing,
    Preprocessed(PreprocessedVideo),
    Detecting(PreprocessedVideo),
    Detected {
        video: PreprocessedVideo,
        result: DetectionResult,
    },
    Visualizing {
        video: PreprocessedVideo,
        result: DetectionResult,
    },
    Visualized {
        video: PreprocessedVideo,
        result: DetectionResult,
        visualization: Option<PathBuf>,
        visualization_error: Option<String>,
    },
    Persisted(JobOutcome),
    Failed {
        stage: Stage,
        error: String,
    },
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Preprocessing => "preprocessing",
            Self::Preprocessed(_) => "preprocessed",
            Self::Detecting(_) => "detecting",
            Self::Detected { .. } => "detected",
            Self::Visualizing { .. } => "visualizing",
            Self::Visualized { .. } => "visualized",
            Self::Persisted(_) => "persisted",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted(_) | Self::Failed { .. })
    }

    fn failed(stage: Stage, error: impl fmt::Display) -> Self {
        Self::Failed {
            stage,
            error: error.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs jobs through every stage. Shared by all workers of a batch.
pub struct JobPipeline {
    config: Arc<PipelineConfig>,
    preprocessor: MediaPreprocessor,
    detection: DetectionClient,
    renderer: VisualizationRenderer,
}

impl JobPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        preprocessor: MediaPreprocessor,
        detection: DetectionClient,
        renderer: VisualizationRenderer,
    ) -> Self {
        Self {
            config,
            preprocessor,
            detection,
            renderer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drive `job` from [`JobState::Discovered`] to a terminal state.
    pub async fn run(&self, job: &VideoJob) -> JobOutcome {
        let video = job.video_name();
        let mut state = JobState::Discovered;

        while !state.is_terminal() {
            let from = state.name();
            state = self.step(job, state).await;
            tracing::debug!(video = %video, from, to = state.name(), "Job transition");
        }

        match state {
            JobState::Persisted(outcome) => outcome,
            JobState::Failed { stage, error } => {
                tracing::error!(video = %video, stage = %stage, error = %error, "Job failed");
                JobOutcome::Failed { stage, error }
            }
            other => JobOutcome::Failed {
                stage: Stage::Scheduling,
                error: format!("job stopped in non-terminal state {}", other.name()),
            },
        }
    }

    /// Perform a single transition. Terminal states are returned unchanged.
    pub async fn step(&self, job: &VideoJob, state: JobState) -> JobState {
        match state {
            JobState::Discovered => match tokio::fs::create_dir_all(&job.output_dir).await {
                Ok(()) => JobState::Preprocessing,
                Err(e) => JobState::failed(
                    Stage::Preprocessing,
                    format!("cannot create {}: {e}", job.output_dir.display()),
                ),
            },

            JobState::Preprocessing => match self.preprocessor.preprocess(job).await {
                Ok(video) => JobState::Preprocessed(video),
                Err(e) => JobState::failed(Stage::Preprocessing, e),
            },

            JobState::Preprocessed(video) => JobState::Detecting(video),

            JobState::Detecting(video) => {
                let detected = self
                    .detection
                    .detect(
                        &video,
                        &job.video_name(),
                        &self.config.model,
                        self.config.temperature,
                    )
                    .await;
                match detected {
                    Ok(result) => JobState::Detected { video, result },
                    Err(e) => JobState::failed(Stage::Detecting, e),
                }
            }

            JobState::Detected { video, result } if self.config.visualize => {
                JobState::Visualizing { video, result }
            }
            JobState::Detected { video, result } => JobState::Visualized {
                video,
                result,
                visualization: None,
                visualization_error: None,
            },

            JobState::Visualizing { video, result } => {
                let spec = VisualizationSpec::from_detection(&result, self.config.n_brushed_frames);
                let rendered = self
                    .renderer
                    .render(&video, &spec, self.config.vis_fps, &job.visualization_path())
                    .await;
                match rendered {
                    Ok(path) => JobState::Visualized {
                        video,
                        result,
                        visualization: Some(path),
                        visualization_error: None,
                    },
                    Err(e) => {
                        tracing::warn!(video = %job.video_name(), error = %e, "Visualization failed; keeping detection result");
                        JobState::Visualized {
                            video,
                            result,
                            visualization: None,
                            visualization_error: Some(e.to_string()),
                        }
                    }
                }
            }

            JobState::Visualized {
                video,
                result,
                visualization,
                visualization_error,
            } => match persist_result(job, &result).await {
                Ok(result_json) => {
                    tracing::info!(video = %job.video_name(), path = %result_json.display(), "Result saved");
                    JobState::Persisted(JobOutcome::Persisted {
                        result,
                        artifacts: JobArtifacts {
                            labeled_video: video.path,
                            result_json,
                            visualization,
                        },
                        visualization_error,
                    })
                }
                Err(e) => JobState::failed(Stage::Persisting, e),
            },

            terminal @ (JobState::Persisted(_) | JobState::Failed { .. }) => terminal,
        }
    }
}

/// Write `result` as pretty JSON to the job's `result.json`.
pub async fn persist_result(job: &VideoJob, result: &DetectionResult) -> Result<PathBuf, PersistError> {
    let path = job.result_path();
    let json = serde_json::to_string_pretty(result)?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|source| PersistError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
