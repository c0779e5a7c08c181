//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while watching the log.
///
/// None of these are fatal: the orchestrator reports them through its
/// status and keeps polling.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Watched file does not exist (yet, or any more).
    #[error("Log file missing: {0}")]
    FileMissing(PathBuf),

    /// The file exists but cannot be opened.
    #[error("No permission to read {0}")]
    PermissionDenied(PathBuf),

    /// No candidate install location holds a log file.
    #[error("Game.log not found in {searched} known locations, set the path manually")]
    NotFound { searched: usize },

    /// Notify watcher error.
    #[error("Filesystem notifications failed: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom pattern set was rejected.
    #[error(transparent)]
    Pattern(#[from] crate::recognizer::PatternSetError),

    /// A pattern override set was rejected.
    #[error(transparent)]
    Override(#[from] crate::recognizer::OverrideError),

    /// The watcher task is gone.
    #[error("Watcher task has stopped")]
    ChannelClosed,
}

impl WatcherError {
    /// Map an open/read failure for `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &std::path::Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::FileMissing(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(e),
        }
    }
}
