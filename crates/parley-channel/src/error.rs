//! Error types for channel operations

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to create channel directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("channel directory not found: {0}")]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid image payload: {0}")]
    Image(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
