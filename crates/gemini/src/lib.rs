//! Remote vision-model detection of brush-contact frames.
//!
//! Provides the [`detector::VisionDetector`] capability and its Gemini
//! REST implementation, the retry/backoff policy around the remote call,
//! the instruction prompt, and tolerant parsing of model responses into a
//! [`brushscan_core::types::DetectionResult`].

pub mod api;
pub mod backoff;
pub mod client;
pub mod config;
pub mod detector;
pub mod prompt;
pub mod response;
