use serde::{Deserialize, Serialize};

use crate::{EventLevel, EventSource};
use webforge_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

// Declare all domain modules
pub mod cache;
pub mod general;
pub mod intake;
pub mod pipeline;
pub mod process;
pub mod sweep;

// Re-export all domain events
pub use cache::*;
pub use general::*;
pub use intake::*;
pub use pipeline::*;
pub use process::*;
pub use sweep::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Build pipeline lifecycle (submission, phase changes, terminal states)
    Pipeline(PipelineEvent),

    /// Archive extraction and content validation
    Intake(IntakeEvent),

    /// Dependency cache lookups, installs and promotions
    Cache(CacheEvent),

    /// External process execution
    Process(ProcessEvent),

    /// Retention sweeper activity
    Sweep(SweepEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Pipeline(_) => EventSource::PIPELINE,
            Self::Intake(_) => EventSource::INTAKE,
            Self::Cache(_) => EventSource::CACHE,
            Self::Process(_) => EventSource::PROCESS,
            Self::Sweep(_) => EventSource::SWEEP,
        }
    }

    /// Severity of this event; drives the tracing level it is logged at
    #[must_use]
    pub fn log_level(&self) -> EventLevel {
        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. })
            | Self::Pipeline(PipelineEvent::Failed { .. })
            | Self::Intake(IntakeEvent::Rejected { .. })
            | Self::Process(ProcessEvent::TimedOut { .. } | ProcessEvent::Failed { .. }) => {
                EventLevel::Error
            }

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Pipeline(PipelineEvent::CleanupFailed { .. })
            | Self::Intake(IntakeEvent::ContentWarning { .. })
            | Self::Cache(CacheEvent::Fallback { .. })
            | Self::Sweep(SweepEvent::Error { .. }) => EventLevel::Warn,

            // Debug-level events (internal detail)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Cache(CacheEvent::Copied { .. })
            | Self::Process(ProcessEvent::Started { .. })
            | Self::Sweep(SweepEvent::Started { .. }) => EventLevel::Debug,

            // Default to INFO for most events
            _ => EventLevel::Info,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "webforge::events::general",
            Self::Pipeline(_) => "webforge::events::pipeline",
            Self::Intake(_) => "webforge::events::intake",
            Self::Cache(_) => "webforge::events::cache",
            Self::Process(_) => "webforge::events::process",
            Self::Sweep(_) => "webforge::events::sweep",
        }
    }
}
