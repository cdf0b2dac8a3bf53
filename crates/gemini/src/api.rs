//! REST client for the Gemini HTTP endpoints.
//!
//! Wraps the Files API (resumable upload, status lookup, deletion) and
//! `generateContent` using [`reqwest`].

use serde::Deserialize;

use crate::config::GeminiConfig;

/// HTTP client for the Gemini API.
pub struct GeminiApi {
    client: reqwest::Client,
    config: GeminiConfig,
}

/// A file stored by the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    #[serde(default)]
    pub uri: String,
    pub mime_type: Option<String>,
    /// `PROCESSING`, `ACTIVE` or `FAILED`.
    pub state: Option<String>,
}

impl FileResource {
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("STATE_UNSPECIFIED")
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileResource,
}

/// Response body of `models/{model}:generateContent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Errors from the Gemini REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Gemini returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A successful response lacked something the protocol guarantees.
    #[error("unexpected Gemini response: {0}")]
    Protocol(String),
}

impl GeminiApi {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    /// Upload `bytes` with the resumable upload protocol.
    ///
    /// The start request returns a session URL in `x-goog-upload-url`; the
    /// bytes are then sent and finalized in a single request.
    pub async fn upload_file(
        &self,
        display_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<FileResource, GeminiApiError> {
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = Self::ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GeminiApiError::Protocol("missing x-goog-upload-url header".into()))?;

        let response = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        let uploaded: UploadResponse = Self::parse_response(response).await?;
        Ok(uploaded.file)
    }

    /// Fetch the current metadata (including processing state) of a file.
    pub async fn get_file(&self, name: &str) -> Result<FileResource, GeminiApiError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{name}", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Delete an uploaded file.
    pub async fn delete_file(&self, name: &str) -> Result<(), GeminiApiError> {
        let response = self
            .client
            .delete(format!("{}/v1beta/{name}", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Run `generateContent` on `model` with a prepared request body.
    pub async fn generate_content(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> Result<GenerateContentResponse, GeminiApiError> {
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{model}:generateContent",
                self.config.base_url
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`GeminiApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GeminiApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    ///
    /// Reading the body can fail like any transfer; a body that arrives
    /// but does not decode is a [`GeminiApiError::Protocol`] error.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GeminiApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GeminiApiError::Protocol(format!("cannot decode response body: {e}")))
    }
}

/// Request body for a structured-JSON `generateContent` call over one video.
pub fn generate_content_body(
    file: &FileResource,
    mime_type: &str,
    instruction: &str,
    temperature: f32,
    response_schema: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "file_data": { "mime_type": mime_type, "file_uri": file.uri } },
                { "text": instruction },
            ],
        }],
        "generationConfig": {
            "temperature": temperature,
            "responseMimeType": "application/json",
            "responseSchema": response_schema,
        },
    })
}
