//! Core domain types and media capabilities for brushscan.
//!
//! Holds everything the detection and pipeline crates share: job and
//! result types, the [`media::MediaProcessor`] capability with its
//! ffmpeg-backed implementation, and the frame-highlighting algorithm.

pub mod error;
pub mod ffmpeg;
pub mod highlight;
pub mod media;
pub mod types;
