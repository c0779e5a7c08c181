//! Game state events produced by the classification pipeline.

mod kind;
mod types;

pub use kind::EventKind;
pub use types::*;
