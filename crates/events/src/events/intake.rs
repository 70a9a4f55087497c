use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Archive extraction and validation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntakeEvent {
    /// Extraction started
    Started { archive_bytes: u64 },

    /// All entries written to the intake directory
    Extracted {
        files: usize,
        total_bytes: u64,
        skipped: usize,
    },

    /// A single wrapping directory was flattened away
    Flattened { directory: String },

    /// A non-canonical HTML file was duplicated as `index.html`
    EntryDocumentPromoted { from: PathBuf },

    /// Advisory finding on the entry document
    ContentWarning { message: String },

    /// The archive was rejected
    Rejected { failure: FailureContext },
}
