//! Error types for config persistence and plugin wiring.

use std::{io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Errors from loading or persisting the plugin configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, IoError),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),

    #[error("Failed to create file {0}: {1}")]
    FileCreate(PathBuf, IoError),

    #[error("Failed to write to file {0}: {1}")]
    FileWrite(PathBuf, IoError),

    #[error("Failed to sync file {0}: {1}")]
    FileSync(PathBuf, IoError),

    #[error("Failed to rename file from {0} to {1}: {2}")]
    FileRename(PathBuf, PathBuf, IoError),
}

impl From<ConfigError> for plugin_api::PluginError {
    fn from(e: ConfigError) -> Self {
        plugin_api::PluginError::ExecutionError(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
