//! Integration tests for materialization, the dependency cache and the runner

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use webforge_builder::*;
    use webforge_config::{CommandConfig, Config};
    use webforge_errors::{BuildError, CacheError, Error, MaterializeError};
    use webforge_events::{channel, AppEvent, CacheEvent, EventReceiver, GeneralEvent};
    use webforge_platform::{CommandOutput, NativeProcessOperations, PlatformCommand, PlatformContext, ProcessOperations};
    use webforge_types::AppConfig;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.paths.workspaces_root = Some(dir.join("workspaces"));
        config.paths.output_root = Some(dir.join("output"));
        config.paths.cache_root = Some(dir.join("cache"));
        config
    }

    fn drain(rx: &mut EventReceiver) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            events.push(message.event);
        }
        events
    }

    fn write_intake(dir: &Path) {
        fs::create_dir_all(dir.join("css")).unwrap();
        fs::write(dir.join("index.html"), "<html><body>hi</body></html>").unwrap();
        fs::write(dir.join("css/style.css"), "body{}").unwrap();
    }

    /// Stands in for the package manager: records calls and fakes an install
    struct FakeInstaller {
        calls: AtomicUsize,
        exit_code: i32,
    }

    impl FakeInstaller {
        fn new(exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                exit_code,
            })
        }
    }

    #[async_trait]
    impl ProcessOperations for FakeInstaller {
        async fn execute_command(
            &self,
            _ctx: &PlatformContext,
            cmd: PlatformCommand,
        ) -> Result<CommandOutput, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            let dir = cmd.get_current_dir().cloned().unwrap();
            assert!(dir.join("package.json").is_file());
            fs::create_dir_all(dir.join("node_modules/electron")).unwrap();
            fs::write(dir.join("node_modules/electron/index.js"), "module.exports = {}").unwrap();
            Ok(CommandOutput {
                exit_code: Some(self.exit_code),
                stdout: Vec::new(),
                stderr: b"npm ERR! network unreachable\n".to_vec(),
                truncated_bytes: 0,
                duration: Duration::from_millis(50),
            })
        }
    }

    fn manifest(electron: &str) -> DependencyManifest {
        DependencyManifest::from_package_json(&format!(
            r#"{{"name":"x","devDependencies":{{"electron":"{electron}"}}}}"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_materialize_renders_template_and_copies_content() {
        let dir = tempdir().unwrap();
        let intake = dir.path().join("intake");
        let project = dir.path().join("project");
        write_intake(&intake);

        let (tx, mut rx) = channel();
        let ctx = PlatformContext::new(Some(tx));
        let mut app = AppConfig::named("demo");
        app.width = 800;
        app.height = 600;
        let icon = IconAsset::new(Some("icon.png".into()), PNG_BYTES.to_vec());

        let materializer = ProjectMaterializer::from_config(&Config::default()).unwrap();
        let result = materializer
            .materialize(&ctx, &intake, &project, &app, Some(&icon))
            .await
            .unwrap();

        assert_eq!(result.manifest_path, project.join("package.json"));
        assert!(project.join("main.js").is_file());
        assert!(project.join("app/index.html").is_file());
        assert!(project.join("app/css/style.css").is_file());
        assert_eq!(result.icon, Some(project.join("build/icon.png")));
        assert!(result.warnings.is_empty());

        let main_js = fs::read_to_string(project.join("main.js")).unwrap();
        assert!(main_js.contains("width: 800"));
        assert!(main_js.contains("height: 600"));

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&result.manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["build"]["portable"]["artifactName"], "demo.${ext}");
        assert!(result.manifest.content().contains("electron-builder"));
        assert!(!result.manifest.content().contains("demo"));

        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, AppEvent::General(GeneralEvent::DebugLog { .. }))));
    }

    #[tokio::test]
    async fn test_bad_icon_is_a_warning_not_a_failure() {
        let dir = tempdir().unwrap();
        let intake = dir.path().join("intake");
        let project = dir.path().join("project");
        write_intake(&intake);

        let (tx, mut rx) = channel();
        let ctx = PlatformContext::new(Some(tx));
        let icon = IconAsset::new(Some("icon.png".into()), b"not an image".to_vec());

        let result = ProjectMaterializer::from_config(&Config::default())
            .unwrap()
            .materialize(&ctx, &intake, &project, &AppConfig::named("demo"), Some(&icon))
            .await
            .unwrap();

        assert!(result.icon.is_none());
        assert_eq!(result.warnings.len(), 1);
        assert!(!project.join("build").exists());
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, AppEvent::General(GeneralEvent::Warning { .. }))));
    }

    #[tokio::test]
    async fn test_materialize_replaces_previous_project() {
        let dir = tempdir().unwrap();
        let intake = dir.path().join("intake");
        let project = dir.path().join("project");
        write_intake(&intake);
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("stale.txt"), "old").unwrap();

        ProjectMaterializer::from_config(&Config::default())
            .unwrap()
            .materialize(&PlatformContext::default(), &intake, &project, &AppConfig::named("demo"), None)
            .await
            .unwrap();
        assert!(!project.join("stale.txt").exists());
    }

    #[test]
    fn test_template_dir_without_manifest_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "// {{APP_NAME}}").unwrap();
        let mut config = Config::default();
        config.build.template_dir = Some(dir.path().to_path_buf());

        let err = ProjectMaterializer::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            Error::Materialize(MaterializeError::TemplateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_custom_template_dir_is_rendered() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("template");
        fs::create_dir_all(template.join("src")).unwrap();
        fs::write(
            template.join("package.json"),
            r#"{"name":"{{PRODUCT_SLUG}}","dependencies":{"left-pad":"1.3.0"}}"#,
        )
        .unwrap();
        fs::write(template.join("src/app.txt"), "{{APP_NAME}} by {{COMPANY}}").unwrap();
        let intake = dir.path().join("intake");
        write_intake(&intake);

        let mut config = Config::default();
        config.build.template_dir = Some(template);
        let mut app = AppConfig::named("Demo App");
        app.company = "Acme".into();

        let project = dir.path().join("project");
        let result = ProjectMaterializer::from_config(&config)
            .unwrap()
            .materialize(&PlatformContext::default(), &intake, &project, &app, None)
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(project.join("src/app.txt")).unwrap(),
            "Demo App by Acme"
        );
        assert!(result.manifest.content().contains("left-pad"));
    }

    #[tokio::test]
    async fn test_identical_manifests_install_once() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let installer = FakeInstaller::new(0);
        let cache = DependencyCache::new(&config, installer.clone());
        let (tx, mut rx) = channel();
        let ctx = PlatformContext::new(Some(tx));
        let manifest = manifest("^31.0.0");

        let (first, second) = tokio::join!(cache.ensure(&ctx, &manifest), cache.ensure(&ctx, &manifest));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);
        assert_ne!(first.warm, second.warm);
        assert_eq!(first.path, second.path);
        assert!(first.path.join(".complete").is_file());

        let events = drain(&mut rx);
        let promoted = events
            .iter()
            .filter(|e| matches!(e, AppEvent::Cache(CacheEvent::Promoted { .. })))
            .count();
        let misses = events
            .iter()
            .filter(|e| matches!(e, AppEvent::Cache(CacheEvent::Miss { .. })))
            .count();
        assert_eq!((promoted, misses), (1, 1));

        // A later build sees the warm entry without installing
        let third = cache.ensure(&ctx, &manifest).await.unwrap();
        assert!(third.warm);
        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);

        for name in ["a", "b"] {
            let project = dir.path().join(name);
            fs::create_dir_all(&project).unwrap();
            cache.copy_into(&ctx, &third, &project).await.unwrap();
            assert!(project.join("node_modules/electron/index.js").is_file());
        }
        // Copies are private
        fs::remove_dir_all(dir.path().join("a/node_modules")).unwrap();
        assert!(third.path.join("node_modules/electron/index.js").is_file());
        assert!(dir.path().join("b/node_modules/electron/index.js").is_file());
    }

    #[tokio::test]
    async fn test_new_manifest_replaces_previous_entry() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let installer = FakeInstaller::new(0);
        let cache = DependencyCache::new(&config, installer.clone());
        let ctx = PlatformContext::default();

        let old = cache.ensure(&ctx, &manifest("^31.0.0")).await.unwrap();
        fs::create_dir_all(cache.root().join(".tmp-inprogress")).unwrap();
        let new = cache.ensure(&ctx, &manifest("^32.0.0")).await.unwrap();

        assert!(!old.path.exists());
        assert!(new.path.is_dir());
        assert!(cache.root().join(".tmp-inprogress").is_dir());
        assert_eq!(installer.calls.load(Ordering::SeqCst), 2);

        let entries: Vec<PathBuf> = fs::read_dir(cache.root())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| !p.file_name().unwrap().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert_eq!(entries, vec![new.path.clone()]);
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_entry() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let cache = DependencyCache::new(&config, FakeInstaller::new(1));

        let err = cache
            .ensure(&PlatformContext::default(), &manifest("^31.0.0"))
            .await
            .unwrap_err();
        match err {
            Error::Cache(CacheError::InstallFailed { message }) => {
                assert!(message.contains("exit code 1"));
                assert!(message.contains("network unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fs::read_dir(cache.root()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_refuses() {
        let dir = tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.cache.enabled = false;
        let installer = FakeInstaller::new(0);
        let cache = DependencyCache::new(&config, installer.clone());

        let err = cache
            .ensure(&PlatformContext::default(), &manifest("^31.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cache(CacheError::Disabled)));
        assert_eq!(installer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_copy_from_evicted_entry_fails_cleanly() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let cache = DependencyCache::new(&config, FakeInstaller::new(0));
        let ctx = PlatformContext::default();

        let handle = cache.ensure(&ctx, &manifest("^31.0.0")).await.unwrap();
        fs::remove_dir_all(&handle.path).unwrap();

        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let err = cache.copy_into(&ctx, &handle, &project).await.unwrap_err();
        assert!(matches!(err, Error::Cache(CacheError::CopyFailed { .. })));
        assert!(!project.join("node_modules").exists());
    }

    #[cfg(unix)]
    fn runner_with(dir: &Path, package_script: &str, timeout_secs: u64) -> BuildRunner {
        let mut config = config_in(dir);
        config.build.package = CommandConfig::new("sh", &["-c", package_script]);
        config.build.install = CommandConfig::new("sh", &["-c", "echo install failed >&2; exit 7"]);
        config.build.build_timeout_secs = timeout_secs;
        BuildRunner::new(&config, Arc::new(NativeProcessOperations::new()))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_locates_and_publishes_artifacts() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(
            dir.path(),
            "mkdir -p dist/win-unpacked && printf MZ > dist/demo.exe && printf MZ > dist/win-unpacked/demo.exe",
            30,
        );
        let ctx = PlatformContext::default();

        let located = runner.build(&ctx, &project).await.unwrap();
        assert_eq!(located.files, vec![project.join("dist/demo.exe")]);

        let output = dir.path().join("output/build-1");
        let published = runner.publish(&located, &output).await.unwrap();
        assert_eq!(published.files, vec![output.join("demo.exe")]);
        assert_eq!(fs::read(output.join("demo.exe")).unwrap(), b"MZ");
        // Copied, not moved
        assert!(project.join("dist/demo.exe").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fallback_output_dir_is_searched() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(dir.path(), "mkdir -p release && printf MZ > release/demo.exe", 30);

        let located = runner.build(&PlatformContext::default(), &project).await.unwrap();
        assert_eq!(located.found_in, project.join("release"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(dir.path(), "echo 'packager exploded' >&2; exit 3", 30);

        let err = runner.build(&PlatformContext::default(), &project).await.unwrap_err();
        match err {
            Error::Build(build) => {
                assert!(matches!(
                    build,
                    BuildError::CommandFailed {
                        exit_code: Some(3),
                        ..
                    }
                ));
                assert!(build.diagnostics().unwrap().contains("packager exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_artifacts_is_distinct() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(
            dir.path(),
            "mkdir -p dist && echo done > dist/readme.txt && echo 'skipped win target' >&2",
            30,
        );

        let err = runner.build(&PlatformContext::default(), &project).await.unwrap_err();
        match err {
            Error::Build(build) => {
                assert!(matches!(
                    build,
                    BuildError::NoArtifactsProduced { ref extension, .. } if extension == "exe"
                ));
                assert_eq!(build.diagnostics(), Some("skipped win target"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_timeout_is_reported() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(dir.path(), "echo 'downloading electron' >&2; sleep 30", 1);

        let started = std::time::Instant::now();
        let err = runner.build(&PlatformContext::default(), &project).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(20));
        match err {
            Error::Build(build) => {
                assert!(matches!(build, BuildError::Timeout { seconds: 1, .. }));
                assert_eq!(build.diagnostics(), Some("downloading electron"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_direct_install_failure() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let runner = runner_with(dir.path(), "true", 30);

        let err = runner
            .install_direct(&PlatformContext::default(), &project)
            .await
            .unwrap_err();
        match err {
            Error::Build(BuildError::InstallFailed { message }) => {
                assert_eq!(message, "exit code 7: install failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_packager_is_tool_not_found() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let mut config = config_in(dir.path());
        config.build.package = CommandConfig::new("webforge-no-such-packager", &[]);
        let runner = BuildRunner::new(&config, Arc::new(NativeProcessOperations::new()));

        let err = runner.build(&PlatformContext::default(), &project).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::ToolNotFound { .. })));
    }
}
