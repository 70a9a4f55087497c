//! Submission validation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum SubmitError {
    #[error("upload too large: {size} bytes exceeds the {limit} byte limit")]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("icon too large: {size} bytes exceeds the {limit} byte limit")]
    IconTooLarge { size: u64, limit: u64 },

    #[error("unsupported icon format: {reason}")]
    UnsupportedIcon { reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("build service is shutting down")]
    ShuttingDown,
}

impl UserFacingError for SubmitError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedIcon { .. } => Some("Use a PNG, JPG or ICO icon."),
            Self::ArchiveTooLarge { .. } | Self::IconTooLarge { .. } => {
                Some("Reduce the upload size and try again.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::ShuttingDown)
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::ArchiveTooLarge { .. } => "submit.archive_too_large",
            Self::IconTooLarge { .. } => "submit.icon_too_large",
            Self::UnsupportedIcon { .. } => "submit.unsupported_icon",
            Self::InvalidConfig { .. } => "submit.invalid_config",
            Self::ShuttingDown => "submit.shutting_down",
        };
        Some(code)
    }
}
