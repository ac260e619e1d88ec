//! Error types for the mod watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher setup and the collaborators around the aggregator.
///
/// The classifier and aggregator never produce these; they surface only at
/// the filesystem-watch, sink and configuration boundaries.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watched directory {path} is no longer available: {reason}")]
    RootUnavailable { path: PathBuf, reason: String },

    #[error("Cannot write notifications to {path}: {reason}")]
    SinkFailed { path: PathBuf, reason: String },

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    #[error("Mods path {path} is not an existing directory")]
    NotADirectory { path: PathBuf },

    #[error("No mods path configured")]
    MissingPath,

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
