//! Integration tests for config

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;
    use webforge_config::*;
    use webforge_types::{ColorChoice, OutputFormat};

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"
color = "never"

[paths]
data_dir = "/srv/webforge"
output_root = "/srv/artifacts"

[build]
build_timeout_secs = 900
artifact_extension = "AppImage"

[build.package]
program = "npx"
args = ["electron-builder", "--linux"]

[pipeline]
max_concurrent_builds = 4
retain_failed_workspaces = true
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.build.build_timeout_secs, 900);
        assert_eq!(config.build.artifact_extension, "AppImage");
        assert_eq!(config.build.package.args, vec!["electron-builder", "--linux"]);
        assert_eq!(config.pipeline.max_concurrent_builds, 4);
        assert!(config.pipeline.retain_failed_workspaces);

        // Unset sections keep their defaults
        assert_eq!(config.build.install.program, "npm");
        assert_eq!(config.retention.max_age_secs, 2 * 60 * 60);

        assert_eq!(
            config.workspaces_root(),
            PathBuf::from("/srv/webforge/workspaces")
        );
        assert_eq!(config.output_root(), PathBuf::from("/srv/artifacts"));
        assert_eq!(config.cache_root(), PathBuf::from("/srv/webforge/cache"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = Config::load_from_file(std::path::Path::new("/nonexistent/webforge.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[build\nbuild_timeout_secs = ").unwrap();
        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.limits.max_archive_bytes, 50 * 1024 * 1024);
        assert_eq!(config.limits.max_entry_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_icon_bytes, 5 * 1024 * 1024);
        assert_eq!(config.build.build_timeout_secs, 600);
        assert_eq!(config.build.max_capture_bytes, 1024 * 1024);
        assert_eq!(config.build.output_dir, "dist");
        assert_eq!(config.build.artifact_extension, "exe");
        assert_eq!(config.retention.interval_secs, 15 * 60);
        assert_eq!(config.pipeline.max_concurrent_builds, 0);
        assert!(!config.pipeline.retain_failed_workspaces);
        assert!(config.cache.enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_blocked_extensions_case_insensitive() {
        let config = Config::default();
        assert!(config.is_blocked_extension("EXE"));
        assert!(config.is_blocked_extension(".dylib"));
        assert!(config.is_blocked_extension("Ps1"));
        assert!(!config.is_blocked_extension("html"));
        assert!(!config.is_blocked_extension("js"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.build.build_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retention.max_age_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = Config::default();
        config.pipeline.max_concurrent_builds = 2;
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.pipeline.max_concurrent_builds, 2);
        assert_eq!(parsed.build.package, config.build.package);
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("WEBFORGE_OUTPUT", "json");
        std::env::set_var("WEBFORGE_COLOR", "always");
        std::env::set_var("WEBFORGE_BUILD_TIMEOUT", "120");
        std::env::set_var("WEBFORGE_CACHE_ENABLED", "no");
        std::env::set_var("WEBFORGE_WORKSPACES_ROOT", "/tmp/wf-work");

        let mut config = Config::default();
        let result = config.merge_env();

        std::env::remove_var("WEBFORGE_OUTPUT");
        std::env::remove_var("WEBFORGE_COLOR");
        std::env::remove_var("WEBFORGE_BUILD_TIMEOUT");
        std::env::remove_var("WEBFORGE_CACHE_ENABLED");
        std::env::remove_var("WEBFORGE_WORKSPACES_ROOT");

        result.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.build.build_timeout_secs, 120);
        assert!(!config.cache.enabled);
        assert_eq!(config.workspaces_root(), PathBuf::from("/tmp/wf-work"));
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("WEBFORGE_MAX_CONCURRENT_BUILDS", "many");

        let mut config = Config::default();
        let result = config.merge_env();
        std::env::remove_var("WEBFORGE_MAX_CONCURRENT_BUILDS");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("WEBFORGE_MAX_CONCURRENT_BUILDS"));
    }
}
