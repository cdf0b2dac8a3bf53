#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid frame rate {raw:?}: {reason}")]
    InvalidFrameRate { raw: String, reason: &'static str },
}
