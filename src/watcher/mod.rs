//! Watcher module for the game client log.
//!
//! Provides the incremental reader, log path discovery and the async
//! orchestrator that feeds the classification pipeline.

mod discovery;
mod error;
mod log_watcher;
mod tailer;

pub use discovery::{candidate_paths, find_first_existing, find_log_file};
pub use error::WatcherError;
pub use log_watcher::{ConnectionState, LogWatcher, WatchEvent, WatchStatus, WatcherHandle};
pub use tailer::{read_last_lines, LogTailer, TailBatch, DEFAULT_MAX_READ_BYTES};
