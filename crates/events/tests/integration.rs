//! Integration tests for events

#[cfg(test)]
mod tests {
    use webforge_errors::IntakeError;
    use webforge_events::*;
    use webforge_types::{BuildId, Phase};

    #[tokio::test]
    async fn test_event_sender_emit_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::Error { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Error);
        assert_eq!(first.meta.source, EventSource::GENERAL);
        assert!(first.meta.correlation_id.is_none());

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.event,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    /// Emitter bound to one build, the way pipeline contexts are
    struct BuildScoped {
        sender: Option<EventSender>,
        build_id: String,
    }

    impl EventEmitter for BuildScoped {
        fn event_sender(&self) -> Option<&EventSender> {
            self.sender.as_ref()
        }

        fn correlation_id(&self) -> Option<&str> {
            Some(&self.build_id)
        }
    }

    #[tokio::test]
    async fn test_correlation_id_is_stamped_on_messages() {
        let (tx, mut rx) = channel();
        let id = BuildId::new();
        let emitter = BuildScoped {
            sender: Some(tx),
            build_id: id.to_string(),
        };

        emitter.emit(AppEvent::Pipeline(PipelineEvent::PhaseChanged {
            build_id: id,
            from: Phase::Uploading,
            to: Phase::Extracting,
            note: "Extracting files".into(),
        }));

        let message = rx.recv().await.unwrap();
        assert_eq!(message.meta.correlation_id.as_deref(), Some(id.to_string().as_str()));
        assert_eq!(message.meta.source, EventSource::PIPELINE);
        assert_eq!(message.meta.level, EventLevel::Info);
    }

    #[test]
    fn test_emitter_without_sender_is_silent() {
        let emitter = BuildScoped {
            sender: None,
            build_id: "nobody".into(),
        };
        emitter.emit_error("dropped on the floor");
    }

    #[test]
    fn test_log_levels_follow_severity() {
        let failed = AppEvent::Process(ProcessEvent::TimedOut {
            command: ProcessCommandDescriptor {
                program: "npm".into(),
                args: vec!["install".into()],
                cwd: None,
            },
            seconds: 600,
        });
        assert_eq!(failed.log_level(), EventLevel::Error);
        assert_eq!(EventMessage::new(failed).meta.tracing_level(), tracing::Level::ERROR);

        let fallback = AppEvent::Cache(CacheEvent::Fallback {
            reason: "disk full".into(),
        });
        assert_eq!(fallback.log_level(), EventLevel::Warn);
        assert_eq!(fallback.log_target(), "webforge::events::cache");

        let hit = AppEvent::Cache(CacheEvent::Hit { hash: "abc".into() });
        assert_eq!(hit.log_level(), EventLevel::Info);
    }

    #[test]
    fn test_failure_context_from_error() {
        let failure = FailureContext::from_error(&IntakeError::NoEntryDocument);
        assert!(!failure.retryable);
        assert!(failure.message.contains("HTML"));
        assert_eq!(failure.code.as_deref(), Some("intake.no_entry_document"));
    }

    #[test]
    fn test_message_serialization_is_tagged() {
        let message = EventMessage::new(AppEvent::Sweep(SweepEvent::Completed {
            scanned: 3,
            removed: 1,
            retained: 2,
            errors: 0,
        }));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["event"]["domain"], "sweep");
        assert_eq!(json["event"]["event"]["type"], "Completed");
        assert_eq!(json["meta"]["source"], "sweep");
    }

    #[test]
    fn test_command_descriptor_display_line() {
        let descriptor = ProcessCommandDescriptor {
            program: "npx".into(),
            args: vec!["electron-builder".into(), "--win".into()],
            cwd: None,
        };
        assert_eq!(descriptor.display_line(), "npx electron-builder --win");
    }
}
