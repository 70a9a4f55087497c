//! Dependency cache error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum CacheError {
    #[error("dependency install failed: {message}")]
    InstallFailed { message: String },

    #[error("cache promotion failed for {hash}: {message}")]
    PromotionFailed { hash: String, message: String },

    #[error("failed to copy cached dependencies: {message}")]
    CopyFailed { message: String },

    #[error("dependency cache disabled")]
    Disabled,
}

impl UserFacingError for CacheError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::InstallFailed { .. } | Self::CopyFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InstallFailed { .. } => "cache.install_failed",
            Self::PromotionFailed { .. } => "cache.promotion_failed",
            Self::CopyFailed { .. } => "cache.copy_failed",
            Self::Disabled => "cache.disabled",
        };
        Some(code)
    }
}
