//! Platform operation errors

use std::borrow::Cow;

use crate::{BuildError, UserFacingError};
use thiserror::Error;

/// Errors that can occur while spawning processes or touching the filesystem
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlatformError {
    #[error("filesystem operation failed: {operation} - {message}")]
    FilesystemOperationFailed { operation: String, message: String },

    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed { command: String, message: String },

    #[error("process timed out after {seconds}s: {command}")]
    ProcessTimeout {
        command: String,
        seconds: u64,
        /// Output captured before the process was killed
        output: String,
    },

    #[error("command not found: {command}")]
    CommandNotFound { command: String },
}

impl From<PlatformError> for BuildError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::ProcessTimeout {
                seconds, output, ..
            } => BuildError::Timeout { seconds, output },
            PlatformError::CommandNotFound { command } => {
                BuildError::ToolNotFound { program: command }
            }
            PlatformError::ProcessExecutionFailed { command, message } => {
                BuildError::CommandFailed {
                    command,
                    exit_code: None,
                    stderr: message,
                }
            }
            PlatformError::FilesystemOperationFailed { message, .. } => {
                BuildError::DistributionFailed { message }
            }
        }
    }
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::FilesystemOperationFailed { .. } => "platform.filesystem_failed",
            Self::ProcessExecutionFailed { .. } => "platform.process_failed",
            Self::ProcessTimeout { .. } => "platform.process_timeout",
            Self::CommandNotFound { .. } => "platform.command_not_found",
        };
        Some(code)
    }
}
