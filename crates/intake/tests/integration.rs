//! Integration tests for archive intake

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;
    use webforge_errors::{Error, IntakeError};
    use webforge_events::{channel, AppEvent, EventSender, IntakeEvent};
    use webforge_intake::{ArchiveIntake, IntakeLimits};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    enum Entry<'a> {
        File(&'a str, &'a [u8]),
        Dir(&'a str),
        Symlink(&'a str, &'a str),
    }

    fn zip_of(entries: &[Entry<'_>]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for entry in entries {
            match entry {
                Entry::File(name, data) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data).unwrap();
                }
                Entry::Dir(name) => writer.add_directory(*name, options).unwrap(),
                Entry::Symlink(name, target) => {
                    writer.add_symlink(*name, *target, options).unwrap();
                }
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn quiet() -> EventSender {
        channel().0
    }

    const PAGE: &[u8] = b"<!doctype html><html><body><h1>Hello</h1></body></html>";

    fn assert_intake_error(err: &Error, check: impl Fn(&IntakeError) -> bool) {
        match err {
            Error::Intake(inner) => assert!(check(inner), "unexpected intake error: {inner}"),
            other => panic!("expected intake error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_extract_and_validate_simple_site() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::Dir("css/"),
            Entry::File("css/site.css", b"body{}"),
        ]);

        let intake = ArchiveIntake::default();
        let files = intake
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap();
        assert_eq!(
            files.files,
            vec![PathBuf::from("css/site.css"), PathBuf::from("index.html")]
        );
        assert_eq!(files.total_bytes, PAGE.len() as u64 + 6);

        let report = intake.validate(&quiet(), &intake_dir).await.unwrap();
        assert_eq!(report.entry_document, PathBuf::from("index.html"));
        assert!(report.promoted_from.is_none());
        assert!(!report.flattened);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_rejected_and_intake_removed() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::File("../../escape.html", PAGE),
        ]);

        let err = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();

        assert_intake_error(&err, |e| matches!(e, IntakeError::UnsafePath { .. }));
        assert!(!intake_dir.exists());
        assert!(!dir.path().join("escape.html").exists());
    }

    #[tokio::test]
    async fn test_backslash_paths_are_normalized() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[Entry::File("site\\pages\\index.html", PAGE)]);

        let files = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap();
        assert_eq!(files.files, vec![PathBuf::from("site/pages/index.html")]);
        assert!(intake_dir.join("site/pages/index.html").is_file());
    }

    #[tokio::test]
    async fn test_blocked_extension_rejected() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::File("tools/Setup.EXE", b"MZ"),
        ]);

        let err = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();

        assert_intake_error(&err, |e| {
            matches!(e, IntakeError::DisallowedType { extension, .. } if extension == "exe")
        });
        assert!(!intake_dir.exists());
    }

    #[tokio::test]
    async fn test_entry_too_large() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::File("big.bin", &[0u8; 2048]),
        ]);

        let limits = IntakeLimits::new(1024 * 1024, 1024, ["exe"]);
        let err = ArchiveIntake::new(limits)
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();

        assert_intake_error(&err, |e| {
            matches!(e, IntakeError::EntryTooLarge { size: 2048, limit: 1024, .. })
        });
        assert!(!intake_dir.exists());
    }

    #[tokio::test]
    async fn test_archive_too_large() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[Entry::File("index.html", PAGE)]);

        let limits = IntakeLimits::new(16, 1024, ["exe"]);
        let err = ArchiveIntake::new(limits)
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();

        assert_intake_error(&err, |e| matches!(e, IntakeError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_declared_total_too_large() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let chunk = vec![b'a'; 4000];
        // Deflate keeps the raw archive small while the declared sizes add up
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::File("a.txt", &chunk),
            Entry::File("b.txt", &chunk),
        ]);
        assert!(archive.len() < 6000);

        let limits = IntakeLimits::new(6000, 5000, ["exe"]);
        let err = ArchiveIntake::new(limits)
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();

        assert_intake_error(&err, |e| matches!(e, IntakeError::TooLarge { .. }));
        assert!(!intake_dir.exists());
    }

    #[tokio::test]
    async fn test_invalid_archive() {
        let dir = tempdir().unwrap();
        let err = ArchiveIntake::default()
            .extract(&quiet(), b"definitely not a zip".to_vec(), &dir.path().join("i"))
            .await
            .unwrap_err();
        assert_intake_error(&err, |e| matches!(e, IntakeError::InvalidArchive { .. }));
    }

    #[tokio::test]
    async fn test_empty_archive_after_skipping_metadata() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::Dir("assets/"),
            Entry::File("__MACOSX/._index.html", b"junk"),
            Entry::File(".DS_Store", b"junk"),
        ]);

        let err = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();
        assert_intake_error(&err, |e| matches!(e, IntakeError::EmptyArchive));
        assert!(!intake_dir.exists());
    }

    #[tokio::test]
    async fn test_metadata_entries_skipped() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::File("__MACOSX/._index.html", b"junk"),
            Entry::File("img/Thumbs.db", b"junk"),
        ]);

        let files = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.skipped, 2);
        assert!(!intake_dir.join("__MACOSX").exists());
    }

    #[tokio::test]
    async fn test_symlink_entry_rejected() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("index.html", PAGE),
            Entry::Symlink("passwd", "/etc/passwd"),
        ]);

        let err = ArchiveIntake::default()
            .extract(&quiet(), archive, &intake_dir)
            .await
            .unwrap_err();
        assert_intake_error(&err, |e| matches!(e, IntakeError::UnsafePath { .. }));
        assert!(!intake_dir.exists());
    }

    #[tokio::test]
    async fn test_wrapper_directory_is_flattened() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("my-site/index.html", PAGE),
            Entry::File("my-site/js/app.js", b"console.log(1)"),
            // Same name as the wrapper must survive the move
            Entry::File("my-site/my-site/notes.txt", b"nested"),
        ]);
        let (tx, mut rx) = channel();

        let intake = ArchiveIntake::default();
        intake.extract(&tx, archive, &intake_dir).await.unwrap();
        let report = intake.validate(&tx, &intake_dir).await.unwrap();

        assert!(report.flattened);
        assert!(intake_dir.join("index.html").is_file());
        assert!(intake_dir.join("js/app.js").is_file());
        assert!(intake_dir.join("my-site/notes.txt").is_file());

        let mut saw_flatten = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(message.event, AppEvent::Intake(IntakeEvent::Flattened { .. })) {
                saw_flatten = true;
            }
        }
        assert!(saw_flatten);
    }

    #[tokio::test]
    async fn test_wrapper_holding_scratch_like_names_is_flattened() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("site/index.html", PAGE),
            Entry::File("site/.webforge-flatten/keep.txt", b"kept"),
            Entry::File("site/.webforge-flatten-x/also.txt", b"also"),
        ]);

        let intake = ArchiveIntake::default();
        intake.extract(&quiet(), archive, &intake_dir).await.unwrap();
        let report = intake.validate(&quiet(), &intake_dir).await.unwrap();

        assert!(report.flattened);
        assert!(intake_dir.join("index.html").is_file());
        assert_eq!(
            std::fs::read(intake_dir.join(".webforge-flatten/keep.txt")).unwrap(),
            b"kept"
        );
        assert!(intake_dir.join(".webforge-flatten-x/also.txt").is_file());
        assert!(!intake_dir.join("site").exists());
        // Nothing but the hoisted entries remains at the root
        assert_eq!(std::fs::read_dir(&intake_dir).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_wrapper_without_direct_html_is_kept() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[Entry::File("wrap/sub/page.html", PAGE)]);

        let intake = ArchiveIntake::default();
        intake.extract(&quiet(), archive, &intake_dir).await.unwrap();
        let report = intake.validate(&quiet(), &intake_dir).await.unwrap();

        assert!(!report.flattened);
        assert_eq!(report.promoted_from, Some(PathBuf::from("wrap/sub/page.html")));
        assert_eq!(
            std::fs::read(intake_dir.join("index.html")).unwrap(),
            PAGE.to_vec()
        );
    }

    #[tokio::test]
    async fn test_first_html_in_sorted_order_is_promoted() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("pages/home.htm", b"<html>home</html>"),
            Entry::File("about.html", b"<html>about</html>"),
            Entry::File("style.css", b"body{}"),
        ]);

        let intake = ArchiveIntake::default();
        intake.extract(&quiet(), archive, &intake_dir).await.unwrap();
        let report = intake.validate(&quiet(), &intake_dir).await.unwrap();

        assert_eq!(report.promoted_from, Some(PathBuf::from("about.html")));
        assert_eq!(
            std::fs::read_to_string(intake_dir.join("index.html")).unwrap(),
            "<html>about</html>"
        );
        // The original stays in place
        assert!(intake_dir.join("about.html").is_file());
    }

    #[tokio::test]
    async fn test_no_entry_document() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[
            Entry::File("readme.txt", b"no pages here"),
            Entry::File("app.js", b"1"),
        ]);

        let intake = ArchiveIntake::default();
        intake.extract(&quiet(), archive, &intake_dir).await.unwrap();
        let err = intake.validate(&quiet(), &intake_dir).await.unwrap_err();
        assert_intake_error(&err, |e| matches!(e, IntakeError::NoEntryDocument));
    }

    #[tokio::test]
    async fn test_advisory_warnings_do_not_fail() {
        let dir = tempdir().unwrap();
        let intake_dir = dir.path().join("intake");
        let archive = zip_of(&[Entry::File(
            "index.html",
            b"<div onclick=\"go()\">x</div><script>document.write('x')</script>",
        )]);
        let (tx, mut rx) = channel();

        let intake = ArchiveIntake::default();
        intake.extract(&tx, archive, &intake_dir).await.unwrap();
        let report = intake.validate(&tx, &intake_dir).await.unwrap();

        assert_eq!(report.warnings.len(), 3);
        let mut warnings = 0;
        while let Ok(message) = rx.try_recv() {
            if matches!(
                message.event,
                AppEvent::Intake(IntakeEvent::ContentWarning { .. })
            ) {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 3);
    }

    #[tokio::test]
    async fn test_rejection_emits_event() {
        let dir = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let _ = ArchiveIntake::default()
            .extract(&tx, b"PK-not-really".to_vec(), &dir.path().join("x"))
            .await;

        let mut rejected = false;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Intake(IntakeEvent::Rejected { failure }) = message.event {
                assert_eq!(failure.code.as_deref(), Some("intake.invalid_archive"));
                rejected = true;
            }
        }
        assert!(rejected);
        assert!(!Path::new(&dir.path().join("x")).exists());
    }
}
