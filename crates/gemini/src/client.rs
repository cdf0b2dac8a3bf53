//! Per-video detection: upload, infer, release, parse.

use std::sync::Arc;

use brushscan_core::types::{DetectionResult, PreprocessedVideo};

use crate::backoff::{retry_with_backoff, DetectionError, RetryPolicy};
use crate::detector::{InferenceRequest, VisionDetector};
use crate::prompt::DETECTION_INSTRUCTION;
use crate::response::parse_detection;

/// Runs one detection per preprocessed video against a [`VisionDetector`].
///
/// Cheap to clone; every job in a batch shares the same detector and policy.
#[derive(Clone)]
pub struct DetectionClient {
    detector: Arc<dyn VisionDetector>,
    policy: RetryPolicy,
}

impl DetectionClient {
    pub fn new(detector: Arc<dyn VisionDetector>, policy: RetryPolicy) -> Self {
        Self { detector, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Detect the first full-contact frame of each mouse in `video`.
    ///
    /// Upload and inference are retried independently under the policy.
    /// The uploaded copy is released whether inference succeeds or not;
    /// a failed release is logged and otherwise ignored. Output that
    /// arrives but cannot be interpreted still yields a result.
    pub async fn detect(
        &self,
        video: &PreprocessedVideo,
        video_name: &str,
        model: &str,
        temperature: f32,
    ) -> Result<DetectionResult, DetectionError> {
        let remote = retry_with_backoff(&self.policy, "upload", video_name, || {
            self.detector.upload(&video.path)
        })
        .await?;
        tracing::debug!(video = video_name, remote = %remote.name, "Video uploaded");

        let request = InferenceRequest {
            model: model.to_string(),
            temperature,
            instruction: DETECTION_INSTRUCTION.to_string(),
        };
        let raw = retry_with_backoff(&self.policy, "inference", video_name, || {
            self.detector.infer(&remote, &request)
        })
        .await;

        if let Err(e) = self.detector.release(&remote).await {
            tracing::warn!(video = video_name, remote = %remote.name, error = %e, "Failed to release uploaded video");
        }

        let raw = raw?;
        let result = parse_detection(&raw, video_name, video.frame_count);
        tracing::info!(
            video = video_name,
            left = ?result.left,
            right = ?result.right,
            "Detection complete",
        );
        Ok(result)
    }
}
