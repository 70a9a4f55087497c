#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build status tracking
//!
//! The tracker is the single source of truth for build progress. It is
//! written by the pipeline coordinator and read by status queries. Every
//! phase change is checked against the transition table on [`Phase`], so a
//! record can only move forward or into `FAILED`.
//!
//! Records are never removed; deleting a build's files on disk does not
//! affect its status.

mod store;

pub use store::{MemoryStatusStore, RecordUpdate, StatusStore};

use std::sync::Arc;

use chrono::Utc;
use webforge_errors::{Error, StateError};
use webforge_types::{BuildId, BuildRecord, BuildStatus, Phase};

/// Extra fields recorded with a transition
#[derive(Debug, Clone, Default)]
pub struct TransitionDetails {
    /// Replaces the phase's default description
    pub note: Option<String>,
    pub estimated_time: Option<String>,
    pub download_locator: Option<String>,
    pub error: Option<String>,
}

impl TransitionDetails {
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn with_estimated_time(mut self, estimate: impl Into<String>) -> Self {
        self.estimated_time = Some(estimate.into());
        self
    }
}

/// Validated access to build records
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn StatusStore>,
}

impl std::fmt::Debug for StatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusTracker").finish_non_exhaustive()
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl StatusTracker {
    #[must_use]
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStatusStore::new()))
    }

    /// Create the `UPLOADING` record for a new submission
    ///
    /// # Errors
    ///
    /// Returns `StateError::AlreadyExists` if `id` is already tracked.
    pub fn register(&self, id: BuildId, app_name: impl Into<String>) -> Result<BuildRecord, Error> {
        let record = BuildRecord::new(id, app_name);
        self.store.insert(record.clone())?;
        Ok(record)
    }

    /// Current snapshot, or the synthetic not-found marker
    #[must_use]
    pub fn status(&self, id: &BuildId) -> BuildStatus {
        self.store
            .get(id)
            .map_or_else(|| BuildStatus::not_found(id.to_string()), BuildStatus::Known)
    }

    /// Status for an identifier supplied as text; malformed ids are unknown
    #[must_use]
    pub fn lookup(&self, raw: &str) -> BuildStatus {
        match raw.trim().parse::<BuildId>() {
            Ok(id) => self.status(&id),
            Err(_) => BuildStatus::not_found(raw),
        }
    }

    #[must_use]
    pub fn get(&self, id: &BuildId) -> Option<BuildRecord> {
        self.store.get(id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<BuildId> {
        self.store.ids()
    }

    /// Move a build to `to`, stamping the update time and description.
    ///
    /// # Errors
    ///
    /// Returns `StateError::BuildNotFound` for unknown builds and
    /// `StateError::InvalidTransition` when the transition table forbids the
    /// move; the record is unchanged in both cases.
    pub fn transition(
        &self,
        id: &BuildId,
        to: Phase,
        details: TransitionDetails,
    ) -> Result<BuildRecord, Error> {
        let mut details = Some(details);
        self.store.update(id, &mut |record| {
            if !record.phase.can_transition_to(to) {
                return Err(StateError::InvalidTransition {
                    build_id: record.id.to_string(),
                    from: record.phase.to_string(),
                    to: to.to_string(),
                }
                .into());
            }
            let details = details.take().unwrap_or_default();
            record.phase = to;
            record.updated_at = Utc::now();
            record.note = Some(details.note.unwrap_or_else(|| to.description().to_string()));
            if details.estimated_time.is_some() {
                record.estimated_time = details.estimated_time;
            }
            if details.download_locator.is_some() {
                record.download_locator = details.download_locator;
            }
            if details.error.is_some() {
                record.error = details.error;
            }
            Ok(())
        })
    }

    /// Advance to the next phase on the success path
    ///
    /// # Errors
    ///
    /// As [`StatusTracker::transition`]; a terminal record cannot advance.
    pub fn advance(&self, id: &BuildId, details: TransitionDetails) -> Result<BuildRecord, Error> {
        let current = self.store.get(id).ok_or_else(|| StateError::BuildNotFound {
            build_id: id.to_string(),
        })?;
        let Some(next) = current.phase.next() else {
            return Err(StateError::InvalidTransition {
                build_id: id.to_string(),
                from: current.phase.to_string(),
                to: current.phase.to_string(),
            }
            .into());
        };
        self.transition(id, next, details)
    }

    /// Record a terminal failure with its message verbatim
    ///
    /// # Errors
    ///
    /// As [`StatusTracker::transition`]; a completed or already failed build
    /// cannot fail again.
    pub fn fail(&self, id: &BuildId, message: impl Into<String>) -> Result<BuildRecord, Error> {
        let message = message.into();
        self.transition(
            id,
            Phase::Failed,
            TransitionDetails {
                note: Some(Phase::Failed.description().to_string()),
                error: Some(message),
                ..TransitionDetails::default()
            },
        )
    }

    /// Mark the build completed with its download locator
    ///
    /// # Errors
    ///
    /// As [`StatusTracker::transition`]; only `DISTRIBUTING` may complete.
    pub fn complete(&self, id: &BuildId, download_locator: impl Into<String>) -> Result<BuildRecord, Error> {
        self.transition(
            id,
            Phase::Completed,
            TransitionDetails {
                download_locator: Some(download_locator.into()),
                ..TransitionDetails::default()
            },
        )
    }

    /// Attach advisory findings without changing the phase
    ///
    /// # Errors
    ///
    /// Returns `StateError::BuildNotFound` for unknown builds.
    pub fn add_warnings(&self, id: &BuildId, warnings: &[String]) -> Result<BuildRecord, Error> {
        self.store.update(id, &mut |record| {
            record.warnings.extend(warnings.iter().cloned());
            record.updated_at = Utc::now();
            Ok(())
        })
    }
}
