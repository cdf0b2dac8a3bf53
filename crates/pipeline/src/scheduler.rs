//! Bounded worker pool over job pipelines.
//!
//! Every job gets its own task; a semaphore with `workers` permits bounds
//! how many run at once. Tasks share nothing mutable: each returns its own
//! outcome, which the scheduler collects back in discovery order. A task
//! that panics is reported as failed without disturbing its siblings.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;

use brushscan_core::types::VideoJob;

use crate::job::{JobOutcome, JobPipeline, Stage};
use crate::report::{BatchRun, JobEntry};

pub struct BatchScheduler {
    pipeline: Arc<JobPipeline>,
    workers: usize,
}

impl BatchScheduler {
    /// Pool size is taken from the pipeline's configuration.
    pub fn new(pipeline: Arc<JobPipeline>) -> Self {
        let workers = pipeline.config().workers.max(1);
        Self { pipeline, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job to completion and gather the outcomes.
    pub async fn run(&self, jobs: Vec<VideoJob>) -> BatchRun {
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        tracing::info!(jobs = jobs.len(), workers = self.workers, "Starting batch");

        let handles: Vec<_> = jobs
            .iter()
            .map(|job| {
                let pipeline = Arc::clone(&self.pipeline);
                let semaphore = Arc::clone(&semaphore);
                let job = job.clone();

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return JobOutcome::Failed {
                            stage: Stage::Scheduling,
                            error: "worker pool closed".into(),
                        };
                    };
                    tracing::info!(video = %job.video_name(), "Job started");
                    let outcome = pipeline.run(&job).await;
                    tracing::info!(video = %job.video_name(), failed = outcome.is_failed(), "Job finished");
                    outcome
                })
            })
            .collect();

        let mut entries = Vec::with_capacity(jobs.len());
        for (job, handle) in jobs.into_iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(video = %job.video_name(), error = %e, "Job task aborted");
                    JobOutcome::Failed {
                        stage: Stage::Scheduling,
                        error: if e.is_panic() {
                            format!("worker panicked: {e}")
                        } else {
                            e.to_string()
                        },
                    }
                }
            };
            entries.push(JobEntry::new(&job, outcome));
        }

        let run = BatchRun {
            started_at,
            finished_at: Utc::now(),
            jobs: entries,
        };
        tracing::info!(
            succeeded = run.succeeded().count(),
            partial = run.partial().count(),
            failed = run.failed().count(),
            "Batch finished",
        );
        run
    }
}
