//! Batch aggregate: per-job outcomes, the printed summary and `batch_summary.json`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use brushscan_core::types::{FrameIndex, VideoJob};

use crate::error::PersistError;
use crate::job::JobOutcome;

/// File name of the machine-readable batch summary in the output root.
pub const SUMMARY_FILE: &str = "batch_summary.json";

/// One job's identity and final outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEntry {
    pub video: String,
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub outcome: JobOutcome,
}

impl JobEntry {
    pub fn new(job: &VideoJob, outcome: JobOutcome) -> Self {
        Self {
            video: job.video_name(),
            source_path: job.source_path.clone(),
            output_dir: job.output_dir.clone(),
            outcome,
        }
    }
}

/// All jobs of one invocation, in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: Vec<JobEntry>,
}

impl BatchRun {
    /// Jobs persisted with every requested artifact.
    pub fn succeeded(&self) -> impl Iterator<Item = &JobEntry> {
        self.jobs
            .iter()
            .filter(|e| !e.outcome.is_failed() && !e.outcome.is_partial())
    }

    /// Jobs whose detection was persisted but whose visualization failed.
    pub fn partial(&self) -> impl Iterator<Item = &JobEntry> {
        self.jobs.iter().filter(|e| e.outcome.is_partial())
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobEntry> {
        self.jobs.iter().filter(|e| e.outcome.is_failed())
    }

    /// Whether the process should exit non-zero.
    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Human-readable summary, one line per job.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Processed {} video(s) in {:.1}s: {} succeeded, {} partial, {} failed",
            self.jobs.len(),
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0,
            self.succeeded().count(),
            self.partial().count(),
            self.failed().count(),
        );

        for entry in &self.jobs {
            let _ = match &entry.outcome {
                JobOutcome::Persisted {
                    result,
                    visualization_error: None,
                    ..
                } => writeln!(
                    out,
                    "  ok       {}  L={} R={}",
                    entry.video,
                    show_index(result.left),
                    show_index(result.right),
                ),
                JobOutcome::Persisted {
                    result,
                    visualization_error: Some(error),
                    ..
                } => writeln!(
                    out,
                    "  partial  {}  L={} R={}  visualization failed: {error}",
                    entry.video,
                    show_index(result.left),
                    show_index(result.right),
                ),
                JobOutcome::Failed { stage, error } => {
                    writeln!(out, "  FAILED   {}  at {stage}: {error}", entry.video)
                }
            };
        }
        out
    }

    /// Write the run as pretty JSON to [`SUMMARY_FILE`] under `output_root`.
    pub async fn write_summary(&self, output_root: &Path) -> Result<PathBuf, PersistError> {
        let path = output_root.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::create_dir_all(output_root)
            .await
            .map_err(|source| PersistError::Io {
                path: output_root.to_path_buf(),
                source,
            })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| PersistError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

fn show_index(index: Option<FrameIndex>) -> String {
    index.map_or_else(|| "null".to_string(), |i| i.to_string())
}
