//! Vision-model capability and its Gemini implementation.
//!
//! [`VisionDetector`] is the seam between the detection client and the
//! remote service: upload a video, run one inference over it, release
//! it. Every failure is classified as transient or fatal so the caller
//! can decide whether to retry.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use brushscan_core::types::extension_of;

use crate::api::{generate_content_body, FileResource, GeminiApi, GeminiApiError};
use crate::prompt::response_schema;

/// How often an uploaded file's processing state is polled.
const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Give up waiting for an uploaded file to become usable after this long.
const ACTIVE_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Handle to a video stored on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVideo {
    /// Service-side resource name, used for lookup and deletion.
    pub name: String,
    /// URI referenced from inference requests.
    pub uri: String,
    pub mime_type: String,
}

/// Parameters of one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub model: String,
    pub temperature: f32,
    pub instruction: String,
}

/// A classified remote failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisionError {
    /// Expected to succeed on retry (overload, rate limit, network blip).
    #[error("transient: {0}")]
    Transient(String),

    /// Will not resolve by retrying (credential, malformed request, quota).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl VisionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify an HTTP error status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {body}");
        if is_transient_status(status) {
            Self::Transient(message)
        } else {
            Self::Fatal(message)
        }
    }
}

/// Status codes that signal an unavailable or rate-limited service.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

impl From<GeminiApiError> for VisionError {
    fn from(err: GeminiApiError) -> Self {
        match err {
            GeminiApiError::ApiError { status, body } => Self::from_status(status, &body),
            GeminiApiError::Request(e) if is_transport_failure(&e) => {
                Self::Transient(e.to_string())
            }
            GeminiApiError::Request(e) => Self::Fatal(e.to_string()),
            GeminiApiError::Protocol(msg) => Self::Fatal(msg),
        }
    }
}

/// Whether a request error happened on the wire (timeout, refused or
/// dropped connection, interrupted body) rather than while building the
/// request or decoding its answer.
pub fn is_transport_failure(err: &reqwest::Error) -> bool {
    !(err.is_builder() || err.is_redirect() || err.is_decode())
}

/// MIME type announced for an uploaded video.
pub fn video_mime_type(path: &Path) -> &'static str {
    match extension_of(path).as_deref() {
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("m4v") => "video/x-m4v",
        _ => "video/mp4",
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A remote vision model able to answer one instruction about one video.
#[async_trait]
pub trait VisionDetector: Send + Sync {
    /// Make `video` available to the service.
    async fn upload(&self, video: &Path) -> Result<RemoteVideo, VisionError>;

    /// Run the instruction over an uploaded video, returning raw model text.
    async fn infer(
        &self,
        video: &RemoteVideo,
        request: &InferenceRequest,
    ) -> Result<String, VisionError>;

    /// Remove an uploaded video from the service.
    async fn release(&self, video: &RemoteVideo) -> Result<(), VisionError>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// [`VisionDetector`] backed by the Gemini Files and `generateContent` APIs.
pub struct GeminiDetector {
    api: GeminiApi,
    poll_interval: Duration,
    active_timeout: Duration,
}

impl GeminiDetector {
    pub fn new(api: GeminiApi) -> Self {
        Self {
            api,
            poll_interval: ACTIVE_POLL_INTERVAL,
            active_timeout: ACTIVE_TIMEOUT,
        }
    }

    /// Override how often and how long an upload's state is polled.
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.active_timeout = timeout;
        self
    }

    /// Poll until the file leaves the processing state.
    async fn wait_until_active(&self, mut file: FileResource) -> Result<FileResource, VisionError> {
        let deadline = tokio::time::Instant::now() + self.active_timeout;

        loop {
            match file.state() {
                "ACTIVE" => return Ok(file),
                "FAILED" => {
                    return Err(VisionError::Fatal(format!(
                        "file processing failed for {}",
                        file.name
                    )))
                }
                state => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(VisionError::Transient(format!(
                            "timed out waiting for {} to become ACTIVE (last state {state})",
                            file.name
                        )));
                    }
                    tracing::debug!(file = %file.name, state, "Waiting for uploaded file to become ACTIVE");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
            file = self.api.get_file(&file.name).await?;
        }
    }
}

#[async_trait]
impl VisionDetector for GeminiDetector {
    async fn upload(&self, video: &Path) -> Result<RemoteVideo, VisionError> {
        let bytes = tokio::fs::read(video)
            .await
            .map_err(|e| VisionError::Fatal(format!("cannot read {}: {e}", video.display())))?;
        let mime_type = video_mime_type(video);
        let display_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!(video = %display_name, size = bytes.len(), "Uploading video");
        let file = self.api.upload_file(&display_name, mime_type, bytes).await?;
        let name = file.name.clone();
        let file = match self.wait_until_active(file).await {
            Ok(file) => file,
            Err(e) => {
                // The caller only releases files it got back, so a retried
                // upload would otherwise orphan this one.
                if let Err(delete_err) = self.api.delete_file(&name).await {
                    tracing::warn!(file = %name, error = %delete_err, "Failed to delete unusable upload");
                }
                return Err(e);
            }
        };

        Ok(RemoteVideo {
            mime_type: file.mime_type.clone().unwrap_or_else(|| mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn infer(
        &self,
        video: &RemoteVideo,
        request: &InferenceRequest,
    ) -> Result<String, VisionError> {
        let file = FileResource {
            name: video.name.clone(),
            uri: video.uri.clone(),
            mime_type: Some(video.mime_type.clone()),
            state: None,
        };
        let body = generate_content_body(
            &file,
            &video.mime_type,
            &request.instruction,
            request.temperature,
            response_schema(),
        );

        let response = self.api.generate_content(&request.model, &body).await?;
        response.text().ok_or_else(|| {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .or_else(|| response.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".into());
            VisionError::Fatal(format!("model returned no text ({reason})"))
        })
    }

    async fn release(&self, video: &RemoteVideo) -> Result<(), VisionError> {
        self.api.delete_file(&video.name).await?;
        Ok(())
    }
}
