//! Host error types

use std::path::PathBuf;

use parley_channel::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to create settings directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch settings: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Debug, Error)]
pub enum HostError {
    /// The session cannot run without its channel directory.
    #[error("failed to create session channel: {0}")]
    CreateChannel(#[source] ChannelError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
