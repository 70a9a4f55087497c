//! Dependency manifest extraction
//!
//! The cache key must not change with per-app values such as the product
//! name or version, so only the dependency tables of the rendered
//! `package.json` take part. They are re-serialized with sorted keys to get
//! stable bytes.

use serde_json::{Map, Value};
use webforge_errors::{Error, MaterializeError};
use webforge_hash::Hash;

const DEPENDENCY_TABLES: [&str; 2] = ["dependencies", "devDependencies"];
const CACHE_PACKAGE_NAME: &str = "webforge-dependency-cache";

/// The install-relevant part of a project manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyManifest {
    content: String,
    hash: Hash,
}

impl DependencyManifest {
    /// Use `content` verbatim as the manifest to install from
    #[must_use]
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = Hash::from_data(content.as_bytes());
        Self { content, hash }
    }

    /// Derive the canonical dependency manifest from a full `package.json`
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::ScaffoldFailed` if the text is not a JSON
    /// object or a dependency table is not an object.
    pub fn from_package_json(text: &str) -> Result<Self, Error> {
        let parsed: Value = serde_json::from_str(text).map_err(|e| scaffold(format!(
            "project manifest is not valid JSON: {e}"
        )))?;
        let Value::Object(parsed) = parsed else {
            return Err(scaffold("project manifest is not a JSON object"));
        };

        // serde_json's default map is ordered by key
        let mut canonical = Map::new();
        canonical.insert("name".into(), Value::String(CACHE_PACKAGE_NAME.into()));
        canonical.insert("private".into(), Value::Bool(true));
        for table in DEPENDENCY_TABLES {
            match parsed.get(table) {
                None => {}
                Some(Value::Object(entries)) => {
                    canonical.insert(table.into(), Value::Object(entries.clone()));
                }
                Some(_) => {
                    return Err(scaffold(format!("\"{table}\" must be an object")));
                }
            }
        }

        let content = serde_json::to_string_pretty(&Value::Object(canonical))?;
        Ok(Self::from_content(content))
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }
}

fn scaffold(message: impl Into<String>) -> Error {
    MaterializeError::ScaffoldFailed {
        message: message.into(),
    }
    .into()
}
