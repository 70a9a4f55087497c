//! Integration tests for the status tracker

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use webforge_errors::{Error, StateError};
    use webforge_state::*;
    use webforge_types::{BuildId, BuildStatus, Phase};

    #[test]
    fn test_unknown_ids_are_not_found() {
        let tracker = StatusTracker::in_memory();
        let status = tracker.status(&BuildId::new());
        assert_eq!(status.phase_label(), "NOT_FOUND");
        assert!(status.record().is_none());

        assert!(matches!(
            tracker.lookup("not-a-uuid"),
            BuildStatus::NotFound { ref id, .. } if id == "not-a-uuid"
        ));
    }

    #[test]
    fn test_full_success_path() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();

        let mut seen = vec![Phase::Uploading];
        while tracker.get(&id).unwrap().phase != Phase::Distributing {
            let record = tracker.advance(&id, TransitionDetails::default()).unwrap();
            seen.push(record.phase);
        }
        let record = tracker.complete(&id, format!("/download/{id}")).unwrap();
        seen.push(record.phase);

        assert_eq!(seen.len(), 8);
        assert!(seen.windows(2).all(|w| w[0].ordinal() < w[1].ordinal()));
        assert_eq!(record.download_locator, Some(format!("/download/{id}")));
        assert!(record.is_completed());

        // Terminal records do not move
        assert!(tracker.fail(&id, "late").is_err());
        assert!(tracker.advance(&id, TransitionDetails::default()).is_err());
    }

    #[test]
    fn test_status_reads_are_stable_between_transitions() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();
        tracker
            .advance(&id, TransitionDetails::default().with_note("custom"))
            .unwrap();

        let first = tracker.status(&id);
        let second = tracker.status(&id);
        assert_eq!(first, second);
        assert_eq!(first.record().unwrap().note.as_deref(), Some("custom"));
    }

    #[test]
    fn test_estimated_time_is_kept_after_it_is_set() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();
        for _ in 0..4 {
            tracker.advance(&id, TransitionDetails::default()).unwrap();
        }
        let building = tracker
            .advance(&id, TransitionDetails::default().with_estimated_time("2-5 minutes"))
            .unwrap();
        assert_eq!(building.phase, Phase::Building);
        assert_eq!(building.estimated_time.as_deref(), Some("2-5 minutes"));

        let distributing = tracker.advance(&id, TransitionDetails::default()).unwrap();
        assert_eq!(distributing.estimated_time.as_deref(), Some("2-5 minutes"));
    }

    #[test]
    fn test_failure_keeps_message_verbatim() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();
        tracker.advance(&id, TransitionDetails::default()).unwrap();

        let record = tracker
            .fail(&id, "archive contains blocked file type: run.bat")
            .unwrap();
        assert_eq!(record.phase, Phase::Failed);
        assert_eq!(
            record.error.as_deref(),
            Some("archive contains blocked file type: run.bat")
        );
        assert!(matches!(
            tracker.fail(&id, "again"),
            Err(Error::State(StateError::InvalidTransition { .. }))
        ));
        assert_eq!(
            tracker.get(&id).unwrap().error.as_deref(),
            Some("archive contains blocked file type: run.bat")
        );
    }

    #[test]
    fn test_duplicate_and_missing_ids() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();
        assert!(matches!(
            tracker.register(id, "demo"),
            Err(Error::State(StateError::AlreadyExists { .. }))
        ));
        assert!(matches!(
            tracker.advance(&BuildId::new(), TransitionDetails::default()),
            Err(Error::State(StateError::BuildNotFound { .. }))
        ));
    }

    #[test]
    fn test_warnings_accumulate() {
        let tracker = StatusTracker::in_memory();
        let id = BuildId::new();
        tracker.register(id, "demo").unwrap();
        tracker.add_warnings(&id, &["uses eval()".to_string()]).unwrap();
        let record = tracker
            .add_warnings(&id, &["uses document.write".to_string()])
            .unwrap();
        assert_eq!(record.warnings.len(), 2);
        assert_eq!(record.phase, Phase::Uploading);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_builds_are_independent() {
        let tracker = StatusTracker::new(Arc::new(MemoryStatusStore::new()));
        let ids: Vec<BuildId> = (0..16).map(|_| BuildId::new()).collect();
        for id in &ids {
            tracker.register(*id, "demo").unwrap();
        }

        let mut handles = Vec::new();
        for (n, id) in ids.iter().copied().enumerate() {
            let writer = tracker.clone();
            handles.push(tokio::spawn(async move {
                while let Ok(record) = writer.advance(&id, TransitionDetails::default()) {
                    if n % 2 == 1 && record.phase == Phase::Installing {
                        writer.fail(&id, "odd build failed").unwrap();
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }));
            let reader = tracker.clone();
            handles.push(tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..50 {
                    let phase = reader.get(&id).unwrap().phase;
                    assert!(phase.ordinal() >= last);
                    last = phase.ordinal();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for (n, id) in ids.iter().enumerate() {
            let expected = if n % 2 == 1 { Phase::Failed } else { Phase::Completed };
            assert_eq!(tracker.get(id).unwrap().phase, expected);
        }
        assert_eq!(tracker.ids().len(), 16);
    }
}
