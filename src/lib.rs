//! Verse Watch - live game log classification into typed game state events.

pub mod config;
pub mod display;
pub mod event;
pub mod pipeline;
pub mod recognizer;
pub mod watcher;
