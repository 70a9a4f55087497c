//! Build runner error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("build command failed with exit code {exit_code:?}: {command}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        /// Tail of the captured stderr, kept for operators.
        stderr: String,
    },

    #[error("build timeout after {seconds} seconds")]
    Timeout {
        seconds: u64,
        /// Output captured before the build was killed
        output: String,
    },

    #[error("build finished but produced no .{extension} artifacts")]
    NoArtifactsProduced {
        extension: String,
        /// Output of the packager run that produced nothing
        output: String,
    },

    #[error("dependency install failed: {message}")]
    InstallFailed { message: String },

    #[error("failed to publish artifacts: {message}")]
    DistributionFailed { message: String },

    #[error("build tool not found: {program}")]
    ToolNotFound { program: String },
}

impl BuildError {
    /// Raw diagnostic output attached to this error, if any.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr: text, .. }
            | Self::Timeout { output: text, .. }
            | Self::NoArtifactsProduced { output: text, .. }
                if !text.is_empty() =>
            {
                Some(text)
            }
            _ => None,
        }
    }
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        // Raw stderr stays out of the user-facing message.
        match self {
            Self::CommandFailed { exit_code, .. } => Cow::Owned(format!(
                "build command failed with exit code {}",
                exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
            )),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } => {
                Some("Reduce the size of the application or increase the build timeout.")
            }
            Self::ToolNotFound { .. } => {
                Some("Install the build toolchain and make sure it is on PATH.")
            }
            Self::NoArtifactsProduced { .. } => {
                Some("Check the build tool's output directory configuration.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::InstallFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CommandFailed { .. } => "build.command_failed",
            Self::Timeout { .. } => "build.timeout",
            Self::NoArtifactsProduced { .. } => "build.no_artifacts_produced",
            Self::InstallFailed { .. } => "build.install_failed",
            Self::DistributionFailed { .. } => "build.distribution_failed",
            Self::ToolNotFound { .. } => "build.tool_not_found",
        };
        Some(code)
    }
}
