#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Archive intake for the build service
//!
//! Unpacks an untrusted zip archive into a per-build intake directory and
//! validates the result:
//!
//! - size caps on the whole archive and on every entry (declared and actual)
//! - a configurable blacklist of executable and script extensions
//! - path normalization that refuses anything resolving outside the root
//! - a guaranteed `index.html` at the root of the content
//!
//! Extraction is all-or-nothing: on any error the intake directory is gone.

mod content;
mod extract;
pub mod paths;
mod validate;

pub use content::advisory_findings;
pub use validate::ENTRY_DOCUMENT;

use std::collections::HashSet;
use std::path::Path;

use webforge_config::Config;
use webforge_errors::{Error, UserFacingError};
use webforge_events::{AppEvent, EventEmitter, FailureContext, IntakeEvent};
use webforge_types::{ExtractedFileList, ValidationReport};

/// Limits applied to one archive
#[derive(Debug, Clone)]
pub struct IntakeLimits {
    pub max_archive_bytes: u64,
    pub max_entry_bytes: u64,
    blocked_extensions: HashSet<String>,
}

impl IntakeLimits {
    #[must_use]
    pub fn new<I, S>(max_archive_bytes: u64, max_entry_bytes: u64, blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_archive_bytes,
            max_entry_bytes,
            blocked_extensions: blocked
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.limits.max_archive_bytes,
            config.limits.max_entry_bytes,
            &config.limits.blocked_extensions,
        )
    }

    /// Case-insensitive blacklist lookup
    #[must_use]
    pub fn is_blocked(&self, extension: &str) -> bool {
        self.blocked_extensions
            .contains(&extension.trim_start_matches('.').to_ascii_lowercase())
    }
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Extracts and validates uploaded archives
#[derive(Debug, Clone, Default)]
pub struct ArchiveIntake {
    limits: IntakeLimits,
}

impl ArchiveIntake {
    #[must_use]
    pub fn new(limits: IntakeLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &IntakeLimits {
        &self.limits
    }

    /// Unpack `archive` into `intake_dir`.
    ///
    /// # Errors
    ///
    /// Returns an `IntakeError` for oversize archives or entries, unsafe
    /// paths, blocked file types and archives without files. The intake
    /// directory does not exist afterwards when an error is returned.
    pub async fn extract<E: EventEmitter>(
        &self,
        emitter: &E,
        archive: Vec<u8>,
        intake_dir: &Path,
    ) -> Result<ExtractedFileList, Error> {
        let limits = self.limits.clone();
        let root = intake_dir.to_path_buf();
        let archive_bytes = archive.len() as u64;
        emitter.emit(AppEvent::Intake(IntakeEvent::Started { archive_bytes }));

        let result = tokio::task::spawn_blocking(move || {
            extract::extract_blocking(&archive, &root, &limits)
        })
        .await
        .map_err(|e| Error::internal(format!("extraction task failed: {e}")))?;

        match &result {
            Ok(files) => {
                emitter.emit(AppEvent::Intake(IntakeEvent::Extracted {
                    files: files.len(),
                    total_bytes: files.total_bytes,
                    skipped: files.skipped,
                }));
            }
            Err(error) => {
                emitter.emit(AppEvent::Intake(IntakeEvent::Rejected {
                    failure: FailureContext::from_error(error),
                }));
                emitter.emit_debug(format!(
                    "rejected archive of {archive_bytes} bytes: {}",
                    error.user_message()
                ));
            }
        }
        result
    }

    /// Validate extracted content, flattening a wrapper directory and
    /// guaranteeing a root `index.html`.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::NoEntryDocument` when no `.html`/`.htm` file
    /// exists, or an I/O error if the layout cannot be rewritten.
    pub async fn validate<E: EventEmitter>(
        &self,
        emitter: &E,
        intake_dir: &Path,
    ) -> Result<ValidationReport, Error> {
        let root = intake_dir.to_path_buf();
        let read_limit = self.limits.max_entry_bytes;
        let result =
            tokio::task::spawn_blocking(move || validate::validate_blocking(&root, read_limit))
                .await
                .map_err(|e| Error::internal(format!("validation task failed: {e}")))?;

        match &result {
            Ok(report) => {
                if report.flattened {
                    emitter.emit(AppEvent::Intake(IntakeEvent::Flattened {
                        directory: intake_dir.display().to_string(),
                    }));
                }
                if let Some(from) = &report.promoted_from {
                    emitter.emit(AppEvent::Intake(IntakeEvent::EntryDocumentPromoted {
                        from: from.clone(),
                    }));
                }
                for warning in &report.warnings {
                    emitter.emit(AppEvent::Intake(IntakeEvent::ContentWarning {
                        message: warning.clone(),
                    }));
                }
            }
            Err(error) => {
                emitter.emit(AppEvent::Intake(IntakeEvent::Rejected {
                    failure: FailureContext::from_error(error),
                }));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webforge_errors::IntakeError;

    #[test]
    fn blocked_lookup_is_case_insensitive() {
        let limits = IntakeLimits::new(10, 5, ["EXE", ".sh"]);
        assert!(limits.is_blocked("exe"));
        assert!(limits.is_blocked(".SH"));
        assert!(!limits.is_blocked("html"));
    }

    #[test]
    fn default_limits_follow_config() {
        let limits = IntakeLimits::default();
        assert_eq!(limits.max_archive_bytes, 50 * 1024 * 1024);
        assert_eq!(limits.max_entry_bytes, 10 * 1024 * 1024);
        assert!(limits.is_blocked("dylib"));
        assert!(matches!(
            Error::from(IntakeError::EmptyArchive),
            Error::Intake(IntakeError::EmptyArchive)
        ));
    }
}
