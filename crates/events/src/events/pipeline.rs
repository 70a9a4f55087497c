use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use webforge_types::{BuildId, Phase};

use super::FailureContext;

/// Build pipeline lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Submission accepted and queued
    Submitted { build_id: BuildId, app_name: String },

    /// Record advanced to a new phase
    PhaseChanged {
        build_id: BuildId,
        from: Phase,
        to: Phase,
        note: String,
    },

    /// Pipeline reached `COMPLETED`
    Completed {
        build_id: BuildId,
        artifact: PathBuf,
        duration: Duration,
    },

    /// Pipeline reached `FAILED`
    Failed {
        build_id: BuildId,
        phase: Phase,
        failure: FailureContext,
        /// Raw tool diagnostics for operators
        diagnostics: Option<String>,
    },

    /// Best-effort workspace cleanup did not succeed
    CleanupFailed {
        build_id: BuildId,
        path: PathBuf,
        message: String,
    },
}
