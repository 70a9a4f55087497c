use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dependency cache events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    /// Warm entry found for the manifest hash
    Hit { hash: String },

    /// No entry for the manifest hash; an install follows
    Miss { hash: String },

    /// Fresh install promoted to be the current entry
    Promoted { hash: String, evicted: usize },

    /// Private copy handed to a build
    Copied { hash: String, destination: PathBuf },

    /// Cache unusable for this build; installing directly instead
    Fallback { reason: String },
}
