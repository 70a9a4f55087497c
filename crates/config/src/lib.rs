#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for webforge
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded, see [`constants`])
//! - Configuration file (~/.config/webforge/config.toml)
//! - Environment variables (`WEBFORGE_*`)
//! - CLI flags (applied by the binary)

pub mod constants;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use webforge_errors::{ConfigError, Error};
use webforge_types::{ColorChoice, OutputFormat};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Filesystem roots. Unset roots live under `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub data_dir: Option<PathBuf>,
    pub workspaces_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub cache_root: Option<PathBuf>,
}

/// Upload and archive limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
    #[serde(default = "default_max_icon_bytes")]
    pub max_icon_bytes: u64,
    #[serde(default = "default_blocked_extensions")]
    pub blocked_extensions: Vec<String>,
}

/// A program and its arguments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    #[must_use]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// External toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Dependency install (run in the project or a cache temp dir)
    #[serde(default = "default_install_command")]
    pub install: CommandConfig,
    /// Packaging step producing the executable
    #[serde(default = "default_package_command")]
    pub package: CommandConfig,
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,
    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,
    /// Per-stream capture limit; older output is dropped first
    #[serde(default = "default_max_capture_bytes")]
    pub max_capture_bytes: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_fallback_dirs")]
    pub fallback_dirs: Vec<String>,
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
    #[serde(default = "default_estimated_time")]
    pub estimated_time: String,
    /// Directory overriding the embedded project template
    pub template_dir: Option<PathBuf>,
    /// Extra environment for every toolchain invocation
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Dependency cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default = "default_dependency_dir")]
    pub dependency_dir: String,
}

/// Retention sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_retention_max_age")]
    pub max_age_secs: u64,
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// 0 = unlimited
    #[serde(default)]
    pub max_concurrent_builds: usize,
    /// Keep workspaces of failed builds until the sweeper removes them
    #[serde(default)]
    pub retain_failed_workspaces: bool,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: default_max_archive_bytes(),
            max_entry_bytes: default_max_entry_bytes(),
            max_icon_bytes: default_max_icon_bytes(),
            blocked_extensions: default_blocked_extensions(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            install: default_install_command(),
            package: default_package_command(),
            build_timeout_secs: default_build_timeout(),
            install_timeout_secs: default_install_timeout(),
            max_capture_bytes: default_max_capture_bytes(),
            output_dir: default_output_dir(),
            fallback_dirs: default_fallback_dirs(),
            artifact_extension: default_artifact_extension(),
            estimated_time: default_estimated_time(),
            template_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            manifest_file: default_manifest_file(),
            dependency_dir: default_dependency_dir(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_retention_interval(),
            max_age_secs: default_retention_max_age(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_max_archive_bytes() -> u64 {
    constants::MAX_ARCHIVE_BYTES
}

fn default_max_entry_bytes() -> u64 {
    constants::MAX_ENTRY_BYTES
}

fn default_max_icon_bytes() -> u64 {
    constants::MAX_ICON_BYTES
}

fn default_blocked_extensions() -> Vec<String> {
    constants::BLOCKED_EXTENSIONS
        .iter()
        .map(|ext| (*ext).to_string())
        .collect()
}

fn default_install_command() -> CommandConfig {
    CommandConfig::new(
        "npm",
        &["install", "--no-audit", "--no-fund", "--loglevel=error"],
    )
}

fn default_package_command() -> CommandConfig {
    CommandConfig::new(
        "npx",
        &["electron-builder", "--win", "--x64", "--publish", "never"],
    )
}

fn default_build_timeout() -> u64 {
    constants::BUILD_TIMEOUT_SECS
}

fn default_install_timeout() -> u64 {
    constants::INSTALL_TIMEOUT_SECS
}

fn default_max_capture_bytes() -> usize {
    constants::MAX_CAPTURE_BYTES
}

fn default_output_dir() -> String {
    constants::OUTPUT_DIR.to_string()
}

fn default_fallback_dirs() -> Vec<String> {
    vec!["release".to_string(), "out".to_string()]
}

fn default_artifact_extension() -> String {
    constants::ARTIFACT_EXTENSION.to_string()
}

fn default_estimated_time() -> String {
    constants::ESTIMATED_BUILD_TIME.to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_manifest_file() -> String {
    constants::MANIFEST_FILE.to_string()
}

fn default_dependency_dir() -> String {
    constants::DEPENDENCY_DIR.to_string()
}

fn default_retention_interval() -> u64 {
    constants::RETENTION_INTERVAL_SECS
}

fn default_retention_max_age() -> u64 {
    constants::RETENTION_MAX_AGE_SECS
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("webforge").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // WEBFORGE_OUTPUT
        if let Ok(output) = std::env::var("WEBFORGE_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "WEBFORGE_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // WEBFORGE_COLOR
        if let Ok(color) = std::env::var("WEBFORGE_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "WEBFORGE_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(dir) = std::env::var("WEBFORGE_DATA_DIR") {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("WEBFORGE_WORKSPACES_ROOT") {
            self.paths.workspaces_root = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("WEBFORGE_OUTPUT_ROOT") {
            self.paths.output_root = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("WEBFORGE_CACHE_ROOT") {
            self.paths.cache_root = Some(PathBuf::from(dir));
        }

        if let Some(secs) = parse_env("WEBFORGE_BUILD_TIMEOUT")? {
            self.build.build_timeout_secs = secs;
        }
        if let Some(secs) = parse_env("WEBFORGE_INSTALL_TIMEOUT")? {
            self.build.install_timeout_secs = secs;
        }
        if let Some(max) = parse_env("WEBFORGE_MAX_CONCURRENT_BUILDS")? {
            self.pipeline.max_concurrent_builds = max;
        }
        if let Some(secs) = parse_env("WEBFORGE_RETENTION_MAX_AGE")? {
            self.retention.max_age_secs = secs;
        }
        if let Some(enabled) = parse_bool_env("WEBFORGE_CACHE_ENABLED")? {
            self.cache.enabled = enabled;
        }
        if let Some(retain) = parse_bool_env("WEBFORGE_RETAIN_FAILED")? {
            self.pipeline.retain_failed_workspaces = retain;
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: &str| -> Error {
            ConfigError::Invalid {
                message: message.to_string(),
            }
            .into()
        };

        if self.limits.max_entry_bytes == 0 || self.limits.max_archive_bytes == 0 {
            return Err(invalid("archive limits must be greater than zero"));
        }
        if self.build.build_timeout_secs == 0 || self.build.install_timeout_secs == 0 {
            return Err(invalid("toolchain timeouts must be greater than zero"));
        }
        if self.build.max_capture_bytes == 0 {
            return Err(invalid("build.max_capture_bytes must be greater than zero"));
        }
        if self.build.install.program.trim().is_empty()
            || self.build.package.program.trim().is_empty()
        {
            return Err(invalid("toolchain commands need a program"));
        }
        if self.build.artifact_extension.trim_start_matches('.').is_empty() {
            return Err(invalid("build.artifact_extension must not be empty"));
        }
        if self.retention.interval_secs == 0 || self.retention.max_age_secs == 0 {
            return Err(invalid("retention durations must be greater than zero"));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializeError {
                error: e.to_string(),
            }
            .into()
        })
    }

    /// Base directory for every unset root
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map_or_else(|| PathBuf::from(".webforge"), |dir| dir.join("webforge"))
        })
    }

    /// Get the workspaces root (with default)
    #[must_use]
    pub fn workspaces_root(&self) -> PathBuf {
        self.paths
            .workspaces_root
            .clone()
            .unwrap_or_else(|| self.data_dir().join(constants::WORKSPACES_DIR))
    }

    /// Get the output root (with default)
    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        self.paths
            .output_root
            .clone()
            .unwrap_or_else(|| self.data_dir().join(constants::OUTPUT_ROOT_DIR))
    }

    /// Get the dependency cache root (with default)
    #[must_use]
    pub fn cache_root(&self) -> PathBuf {
        self.paths
            .cache_root
            .clone()
            .unwrap_or_else(|| self.data_dir().join(constants::CACHE_DIR))
    }

    #[must_use]
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build.build_timeout_secs)
    }

    #[must_use]
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.build.install_timeout_secs)
    }

    #[must_use]
    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention.interval_secs)
    }

    #[must_use]
    pub fn retention_max_age(&self) -> Duration {
        Duration::from_secs(self.retention.max_age_secs)
    }

    /// Case-insensitive membership test against the blocked extension list
    #[must_use]
    pub fn is_blocked_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.limits
            .blocked_extensions
            .iter()
            .any(|blocked| blocked.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                value,
            }
            .into()),
        Err(_) => Ok(None),
    }
}

fn parse_bool_env(name: &str) -> Result<Option<bool>, Error> {
    match std::env::var(name) {
        Ok(value) => match value.as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                field: name.to_string(),
                value,
            }
            .into()),
        },
        Err(_) => Ok(None),
    }
}
