//! Project materialization error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum MaterializeError {
    #[error("project template not found: {path}")]
    TemplateNotFound { path: String },

    #[error("template {file} has unresolved placeholder {placeholder}")]
    UnresolvedPlaceholder { file: String, placeholder: String },

    #[error("failed to write scaffold: {message}")]
    ScaffoldFailed { message: String },

    #[error("icon processing failed: {message}")]
    IconFailed { message: String },
}

impl UserFacingError for MaterializeError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::TemplateNotFound { .. } => "materialize.template_not_found",
            Self::UnresolvedPlaceholder { .. } => "materialize.unresolved_placeholder",
            Self::ScaffoldFailed { .. } => "materialize.scaffold_failed",
            Self::IconFailed { .. } => "materialize.icon_failed",
        };
        Some(code)
    }
}
