//! Batch orchestration: per-video job pipeline and the bounded worker pool.
//!
//! A batch discovers videos ([`discovery`]), then runs one
//! [`job::JobPipeline`] per video under the [`scheduler::BatchScheduler`].
//! Each job moves through preprocess, detect, optional visualize and
//! persist; a failure ends that job only. Outcomes are gathered into a
//! [`report::BatchRun`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod job;
pub mod preprocess;
pub mod render;
pub mod report;
pub mod scheduler;
