//! Build status records

use crate::{BuildId, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one build's progress as held by the status tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: BuildId,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sanitized application name used for artifact naming
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_locator: Option<String>,
    /// Advisory findings from content validation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl BuildRecord {
    /// Create the initial record for an accepted submission
    #[must_use]
    pub fn new(id: BuildId, app_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            phase: Phase::Uploading,
            created_at: now,
            updated_at: now,
            app_name: app_name.into(),
            note: Some(Phase::Uploading.description().to_string()),
            estimated_time: None,
            error: None,
            download_locator: None,
            warnings: Vec::new(),
        }
    }

    /// Whether the pipeline finished successfully
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Result of a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildStatus {
    Known(BuildRecord),
    NotFound { id: String, phase: String },
}

impl BuildStatus {
    /// Synthesize the marker returned for identifiers the tracker never saw
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            phase: Phase::NOT_FOUND.to_string(),
        }
    }

    /// Phase label as reported to clients
    #[must_use]
    pub fn phase_label(&self) -> &str {
        match self {
            Self::Known(record) => record.phase.as_str(),
            Self::NotFound { .. } => Phase::NOT_FOUND,
        }
    }

    /// The record, when the identifier is known
    #[must_use]
    pub fn record(&self) -> Option<&BuildRecord> {
        match self {
            Self::Known(record) => Some(record),
            Self::NotFound { .. } => None,
        }
    }
}
