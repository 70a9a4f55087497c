#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in webforge
//!
//! Library crates never print or log directly. They emit typed events into
//! an unbounded channel and the binary decides how to render or record them.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by pipeline area (intake, cache, process, ...)
//! - **Unified `EventEmitter` trait**: one API for every emitter
//! - **Envelope metadata**: each message carries an [`EventMeta`] with level,
//!   source and an optional correlation id (normally the build id)

pub mod meta;
pub use meta::{EventLevel, EventMessage, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, CacheEvent, FailureContext, GeneralEvent, IntakeEvent, PipelineEvent,
    ProcessCommandDescriptor, ProcessEvent, SweepEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Sender half of the event channel
pub type EventSender = UnboundedSender<EventMessage>;

/// Receiver half of the event channel
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout webforge
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Correlation id stamped on every emitted message
    fn correlation_id(&self) -> Option<&str> {
        None
    }

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Receiver gone means nobody is listening; not an error
            let _ = sender.send(EventMessage::correlated(event, self.correlation_id()));
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
