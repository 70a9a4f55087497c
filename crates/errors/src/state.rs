//! Build status tracker error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StateError {
    #[error("invalid phase transition for {build_id}: {from} -> {to}")]
    InvalidTransition {
        build_id: String,
        from: String,
        to: String,
    },

    #[error("build not found: {build_id}")]
    BuildNotFound { build_id: String },

    #[error("build already registered: {build_id}")]
    AlreadyExists { build_id: String },
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidTransition { .. } => "state.invalid_transition",
            Self::BuildNotFound { .. } => "state.build_not_found",
            Self::AlreadyExists { .. } => "state.already_exists",
        };
        Some(code)
    }
}
