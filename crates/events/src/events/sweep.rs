use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Retention sweeper events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SweepEvent {
    Started { roots: Vec<PathBuf> },

    Removed { path: PathBuf, age_secs: u64 },

    Completed {
        scanned: usize,
        removed: usize,
        retained: usize,
        errors: usize,
    },

    Error { path: PathBuf, message: String },
}
