//! Archive intake and validation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum IntakeError {
    #[error("invalid archive: {message}")]
    InvalidArchive { message: String },

    #[error("archive too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("archive entry {path} too large: {size} bytes exceeds the {limit} byte limit")]
    EntryTooLarge { path: String, size: u64, limit: u64 },

    #[error("unsafe path in archive: {path} - {reason}")]
    UnsafePath { path: String, reason: String },

    #[error("disallowed file type: {path} (.{extension} files are not accepted)")]
    DisallowedType { path: String, extension: String },

    #[error("archive contains no files")]
    EmptyArchive,

    #[error("archive contains no HTML entry document")]
    NoEntryDocument,
}

impl UserFacingError for IntakeError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArchive { .. } => Some("Upload a valid .zip archive."),
            Self::TooLarge { .. } | Self::EntryTooLarge { .. } => {
                Some("Remove large assets or compress them before uploading.")
            }
            Self::UnsafePath { .. } => {
                Some("Re-create the archive from a plain folder without absolute or parent paths.")
            }
            Self::DisallowedType { .. } => {
                Some("Remove executables and scripts from the archive; only web assets are accepted.")
            }
            Self::EmptyArchive | Self::NoEntryDocument => {
                Some("Include an index.html file at the root of the archive.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidArchive { .. } => "intake.invalid_archive",
            Self::TooLarge { .. } => "intake.too_large",
            Self::EntryTooLarge { .. } => "intake.entry_too_large",
            Self::UnsafePath { .. } => "intake.unsafe_path",
            Self::DisallowedType { .. } => "intake.disallowed_type",
            Self::EmptyArchive => "intake.empty_archive",
            Self::NoEntryDocument => "intake.no_entry_document",
        };
        Some(code)
    }
}
