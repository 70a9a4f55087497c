//! User-supplied application configuration

use serde::{Deserialize, Serialize};
use webforge_errors::SubmitError;

const MIN_DIMENSION: u32 = 200;
const MAX_DIMENSION: u32 = 7680;
const MAX_NAME_LEN: usize = 100;

/// Desktop application settings supplied with a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub company: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "app".to_string(),
            description: String::new(),
            version: default_version(),
            width: default_width(),
            height: default_height(),
            company: String::new(),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

impl AppConfig {
    /// Create a config with the given name and defaults elsewhere
    #[must_use]
    pub fn named(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    /// Check the config before any pipeline phase runs
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), SubmitError> {
        let name = self.app_name.trim();
        if name.is_empty() {
            return Err(invalid("appName", "must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid(
                "appName",
                format!("must be at most {MAX_NAME_LEN} characters"),
            ));
        }
        if sanitize_app_name(name) == FALLBACK_NAME && !name.eq_ignore_ascii_case(FALLBACK_NAME) {
            return Err(invalid("appName", "must contain letters or digits"));
        }

        semver::Version::parse(self.version.trim())
            .map_err(|e| invalid("version", e.to_string()))?;

        for (field, value) in [("width", self.width), ("height", self.height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(invalid(
                    field,
                    format!("{value} is outside {MIN_DIMENSION}..={MAX_DIMENSION}"),
                ));
            }
        }

        Ok(())
    }

    /// Filesystem-safe form of the app name
    #[must_use]
    pub fn sanitized_name(&self) -> String {
        sanitize_app_name(&self.app_name)
    }

    /// Lowercase slug usable as a package name
    #[must_use]
    pub fn package_slug(&self) -> String {
        self.sanitized_name().to_ascii_lowercase()
    }

    /// Reverse-DNS application identifier
    #[must_use]
    pub fn app_id(&self) -> String {
        let company = sanitize_app_name(&self.company).to_ascii_lowercase();
        let vendor = if self.company.trim().is_empty() {
            "webforge".to_string()
        } else {
            company.replace(['-', '.'], "")
        };
        format!("com.{vendor}.{}", self.package_slug().replace('.', "-"))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> SubmitError {
    SubmitError::InvalidConfig {
        field: field.to_string(),
        reason: reason.into(),
    }
}

const FALLBACK_NAME: &str = "app";

/// Reduce an arbitrary app name to a deterministic, filesystem-safe stem.
///
/// Whitespace runs become a single `-`; anything outside `[A-Za-z0-9._-]` is
/// dropped. Leading and trailing separators are trimmed.
#[must_use]
pub fn sanitize_app_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        }
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
