use std::path::PathBuf;

use brushscan_core::error::CoreError;
use brushscan_core::media::MediaError;

/// Failure while finding input videos. Fails the whole batch before any job runs.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("input directory not found: {0}")]
    NotADirectory(PathBuf),

    #[error("no video files found in {0}")]
    NoVideos(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("cannot determine frame rate: {0}")]
    RateDetection(#[source] CoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("frame count changed during preprocessing: input has {expected}, output has {actual}")]
    FrameCountMismatch { expected: u64, actual: u64 },

    #[error("preprocessing produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid visualization frame rate: {0}")]
    InvalidFps(#[from] CoreError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
