//! Report types produced by pipeline stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Files written by archive extraction, relative to the intake root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFileList {
    pub files: Vec<PathBuf>,
    pub total_bytes: u64,
    /// Entries skipped as platform metadata (`__MACOSX`, `.DS_Store`, ...)
    pub skipped: usize,
}

impl ExtractedFileList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Outcome of content validation after extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Entry document relative to the intake root (always `index.html` on success)
    pub entry_document: PathBuf,
    /// The marker file that was duplicated as the entry document, if any
    pub promoted_from: Option<PathBuf>,
    /// Whether a single wrapping directory was flattened away
    pub flattened: bool,
    /// Advisory findings; never fatal
    pub warnings: Vec<String>,
}

/// Executables located and published by the build runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputArtifacts {
    /// Published artifact paths inside the per-build output directory
    pub files: Vec<PathBuf>,
    /// Directory the artifacts were found in
    pub found_in: PathBuf,
}

impl OutputArtifacts {
    /// The artifact served for download
    #[must_use]
    pub fn primary(&self) -> Option<&PathBuf> {
        self.files.first()
    }
}

/// An artifact ready to be streamed to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDownload {
    pub path: PathBuf,
    /// Content-disposition filename derived from the sanitized app name
    pub filename: String,
    pub size: u64,
}

/// Summary of one retention sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: Vec<PathBuf>,
    pub retained: usize,
    pub errors: Vec<String>,
}

impl SweepReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: SweepReport) {
        self.scanned += other.scanned;
        self.removed.extend(other.removed);
        self.retained += other.retained;
        self.errors.extend(other.errors);
    }
}

/// Liveness probe result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    #[must_use]
    pub fn ok(version: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            version: version.into(),
            timestamp: Utc::now(),
        }
    }
}
