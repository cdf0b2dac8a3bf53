//! Connection settings for the Gemini API.

use std::time::Duration;

/// Env var holding the API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Env var overriding the service root.
pub const BASE_URL_ENV: &str = "GEMINI_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Upper bound on a single HTTP request, including video upload.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {0} environment variable")]
    MissingApiKey(&'static str),
}

/// Gemini connection settings.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Service root without a trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var               | Default                                     |
    /// |-----------------------|---------------------------------------------|
    /// | `GEMINI_API_KEY`      | required                                    |
    /// | `GEMINI_API_BASE_URL` | `https://generativelanguage.googleapis.com` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Ok(Self::new(api_key, base_url))
    }
}

// Keeps the credential out of logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash() {
        let config = GeminiConfig::new("k", "http://localhost:9000/");
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn debug_redacts_key() {
        let config = GeminiConfig::new("super-secret", "http://localhost");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
