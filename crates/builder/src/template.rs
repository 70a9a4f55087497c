//! Project template and placeholder substitution
//!
//! A template is a set of text files containing `{{NAME}}` placeholders.
//! The embedded default scaffolds an Electron shell that loads `app/index.html`;
//! a directory on disk can replace it.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use walkdir::WalkDir;
use webforge_errors::{Error, MaterializeError};
use webforge_types::AppConfig;

/// Directory (inside the project) that receives the validated web content
pub const CONTENT_DIR: &str = "app";

/// Directory (inside the project) holding build resources such as the icon
pub const RESOURCES_DIR: &str = "build";

const PACKAGE_JSON: &str = r#"{
  "name": "{{PRODUCT_SLUG}}",
  "productName": "{{APP_NAME}}",
  "version": "{{VERSION}}",
  "description": "{{DESCRIPTION}}",
  "author": "{{COMPANY}}",
  "main": "main.js",
  "private": true,
  "devDependencies": {
    "electron": "^31.7.7",
    "electron-builder": "^24.13.3"
  },
  "build": {
    "appId": "{{APP_ID}}",
    "productName": "{{APP_NAME}}",
    "files": ["main.js", "app/**/*"],
    "directories": {
      "output": "dist",
      "buildResources": "build"
    },
    "win": {
      "target": "portable"
    },
    "portable": {
      "artifactName": "{{PRODUCT_SLUG}}.${ext}"
    }
  }
}
"#;

const MAIN_JS: &str = r#"const { app, BrowserWindow, shell } = require('electron');
const path = require('path');

function createWindow() {
  const win = new BrowserWindow({
    width: {{WIDTH}},
    height: {{HEIGHT}},
    title: "{{APP_NAME}}",
    autoHideMenuBar: true,
    webPreferences: {
      contextIsolation: true,
      nodeIntegration: false,
      sandbox: true
    }
  });

  win.webContents.setWindowOpenHandler(({ url }) => {
    shell.openExternal(url);
    return { action: 'deny' };
  });

  win.loadFile(path.join(__dirname, 'app', 'index.html'));
}

app.whenReady().then(createWindow);

app.on('window-all-closed', () => {
  app.quit();
});
"#;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*[A-Za-z0-9_]+\s*\}\}").expect("Invalid placeholder pattern")
});

/// One file of a template
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Placeholder values derived from the submitted app config
#[derive(Debug, Clone)]
pub struct TemplateValues {
    values: BTreeMap<&'static str, String>,
}

impl TemplateValues {
    #[must_use]
    pub fn from_app(config: &AppConfig) -> Self {
        let company = if config.company.trim().is_empty() {
            config.app_name.trim().to_string()
        } else {
            config.company.trim().to_string()
        };
        let mut values = BTreeMap::new();
        values.insert("APP_NAME", config.app_name.trim().to_string());
        values.insert("DESCRIPTION", config.description.clone());
        values.insert("VERSION", config.version.trim().to_string());
        values.insert("WIDTH", config.width.to_string());
        values.insert("HEIGHT", config.height.to_string());
        values.insert("COMPANY", company);
        values.insert("PRODUCT_SLUG", config.package_slug());
        values.insert("APP_ID", config.app_id());
        Self { values }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Escape a value for a JSON (and JS) double-quoted string body
fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// A project template
#[derive(Debug, Clone)]
pub struct ProjectTemplate {
    files: Vec<TemplateFile>,
}

impl ProjectTemplate {
    /// The built-in Electron scaffold
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            files: vec![
                TemplateFile {
                    path: PathBuf::from("package.json"),
                    contents: PACKAGE_JSON.to_string(),
                },
                TemplateFile {
                    path: PathBuf::from("main.js"),
                    contents: MAIN_JS.to_string(),
                },
            ],
        }
    }

    /// Load every file under `dir` as a template file
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::TemplateNotFound` if `dir` or its
    /// `manifest_file` does not exist, or `ScaffoldFailed` if a file cannot
    /// be read as UTF-8 text.
    pub fn from_dir(dir: &Path, manifest_file: &str) -> Result<Self, Error> {
        if !dir.join(manifest_file).is_file() {
            return Err(MaterializeError::TemplateNotFound {
                path: dir.join(manifest_file).display().to_string(),
            }
            .into());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| MaterializeError::ScaffoldFailed {
                message: format!("cannot read template: {e}"),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let contents = std::fs::read_to_string(entry.path()).map_err(|e| {
                MaterializeError::ScaffoldFailed {
                    message: format!("template file {}: {e}", relative.display()),
                }
            })?;
            files.push(TemplateFile {
                path: relative.to_path_buf(),
                contents,
            });
        }
        Ok(Self { files })
    }

    #[must_use]
    pub fn files(&self) -> &[TemplateFile] {
        &self.files
    }

    /// Substitute every placeholder; anything left over is an error
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::UnresolvedPlaceholder` naming the first
    /// placeholder with no value.
    pub fn render(&self, values: &TemplateValues) -> Result<Vec<TemplateFile>, Error> {
        self.files
            .iter()
            .map(|file| {
                let mut contents = file.contents.clone();
                for (key, value) in &values.values {
                    contents = contents.replace(&format!("{{{{{key}}}}}"), &json_escape(value));
                }
                if let Some(leftover) = PLACEHOLDER.find(&contents) {
                    return Err(MaterializeError::UnresolvedPlaceholder {
                        file: file.path.display().to_string(),
                        placeholder: leftover.as_str().to_string(),
                    }
                    .into());
                }
                Ok(TemplateFile {
                    path: file.path.clone(),
                    contents,
                })
            })
            .collect()
    }
}

impl Default for ProjectTemplate {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_template_renders_completely() {
        let mut config = AppConfig::named("My App");
        config.description = "Says \"hi\"\nand more".into();
        config.width = 1024;

        let rendered = ProjectTemplate::embedded()
            .render(&TemplateValues::from_app(&config))
            .unwrap();
        let manifest = &rendered[0];
        assert_eq!(manifest.path, PathBuf::from("package.json"));

        let parsed: serde_json::Value = serde_json::from_str(&manifest.contents).unwrap();
        assert_eq!(parsed["name"], "my-app");
        assert_eq!(parsed["productName"], "My App");
        assert_eq!(parsed["description"], "Says \"hi\"\nand more");
        assert_eq!(parsed["author"], "My App");
        assert_eq!(parsed["build"]["appId"], "com.webforge.my-app");
        assert_eq!(parsed["build"]["portable"]["artifactName"], "my-app.${ext}");

        assert!(rendered[1].contents.contains("width: 1024"));
        assert!(rendered[1].contents.contains("title: \"My App\""));
    }

    #[test]
    fn placeholder_pattern_matches_spaced_names() {
        assert_eq!(
            PLACEHOLDER.find("x {{ APP_NAME }} y").map(|m| m.as_str()),
            Some("{{ APP_NAME }}")
        );
        assert!(PLACEHOLDER.find("{ single } and {{}}").is_none());
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let template = ProjectTemplate {
            files: vec![TemplateFile {
                path: PathBuf::from("main.js"),
                contents: "const a = '{{APP_NAME}}'; const b = '{{ MISSING }}';".into(),
            }],
        };
        let err = template
            .render(&TemplateValues::from_app(&AppConfig::named("x")))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Materialize(MaterializeError::UnresolvedPlaceholder { ref placeholder, .. })
                if placeholder == "{{ MISSING }}"
        ));
    }

    #[test]
    fn json_escape_handles_control_characters() {
        assert_eq!(json_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(json_escape("plain"), "plain");
    }
}
