//! Project materialization
//!
//! Turns validated intake content plus the app config into a project the
//! packager can build: rendered template files at the root, the web content
//! under `app/`, and an optional icon under `build/`.

use std::path::{Path, PathBuf};

use webforge_config::Config;
use webforge_errors::{Error, MaterializeError};
use webforge_events::EventEmitter;
use webforge_platform::fs as platform_fs;
use webforge_types::AppConfig;

use crate::icon::IconAsset;
use crate::manifest::DependencyManifest;
use crate::template::{ProjectTemplate, TemplateValues, CONTENT_DIR, RESOURCES_DIR};

/// A generated project ready for dependency installation
#[derive(Debug, Clone)]
pub struct MaterializedProject {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: DependencyManifest,
    /// Icon written into the build resources, if one was supplied and usable
    pub icon: Option<PathBuf>,
    /// Non-fatal problems (icon failures)
    pub warnings: Vec<String>,
}

/// Generates build projects from a template
#[derive(Debug, Clone)]
pub struct ProjectMaterializer {
    template: ProjectTemplate,
    manifest_file: String,
}

impl ProjectMaterializer {
    #[must_use]
    pub fn new(template: ProjectTemplate, manifest_file: impl Into<String>) -> Self {
        Self {
            template,
            manifest_file: manifest_file.into(),
        }
    }

    /// Use the configured template directory, or the embedded template
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::TemplateNotFound` if a template directory is
    /// configured but unusable.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let template = match &config.build.template_dir {
            Some(dir) => ProjectTemplate::from_dir(dir, &config.cache.manifest_file)?,
            None => ProjectTemplate::embedded(),
        };
        Ok(Self::new(template, config.cache.manifest_file.clone()))
    }

    /// Generate the project at `project_dir` from `intake_dir`.
    ///
    /// `project_dir` is recreated from scratch. Icon problems are reported as
    /// warnings and never fail the call.
    ///
    /// # Errors
    ///
    /// Returns a `MaterializeError` if the template cannot be rendered or
    /// the manifest is missing, or an I/O error if files cannot be written.
    pub async fn materialize<E: EventEmitter>(
        &self,
        emitter: &E,
        intake_dir: &Path,
        project_dir: &Path,
        app: &AppConfig,
        icon: Option<&IconAsset>,
    ) -> Result<MaterializedProject, Error> {
        let rendered = self.template.render(&TemplateValues::from_app(app))?;

        platform_fs::ensure_empty_dir(project_dir).await?;
        let mut manifest_text = None;
        for file in &rendered {
            let target = project_dir.join(&file.path);
            if let Some(parent) = target.parent() {
                platform_fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, file.contents.as_bytes())
                .await
                .map_err(|e| Error::io_with_path(&e, &target))?;
            if file.path == Path::new(&self.manifest_file) {
                manifest_text = Some(file.contents.as_str());
            }
        }

        let Some(manifest_text) = manifest_text else {
            return Err(MaterializeError::TemplateNotFound {
                path: self.manifest_file.clone(),
            }
            .into());
        };
        let manifest = DependencyManifest::from_package_json(manifest_text)?;

        let content_dir = project_dir.join(CONTENT_DIR);
        let copied = platform_fs::copy_directory(intake_dir, &content_dir).await?;
        emitter.emit_debug(format!(
            "copied {copied} bytes of content into {}",
            content_dir.display()
        ));

        let mut warnings = Vec::new();
        let icon = match icon {
            Some(asset) => match write_icon(asset, project_dir).await {
                Ok(path) => Some(path),
                Err(error) => {
                    let message = format!("custom icon skipped: {error}");
                    emitter.emit_warning(message.clone());
                    warnings.push(message);
                    None
                }
            },
            None => None,
        };

        Ok(MaterializedProject {
            root: project_dir.to_path_buf(),
            manifest_path: project_dir.join(&self.manifest_file),
            manifest,
            icon,
            warnings,
        })
    }
}

async fn write_icon(asset: &IconAsset, project_dir: &Path) -> Result<PathBuf, MaterializeError> {
    let format = asset.format().map_err(|e| MaterializeError::IconFailed {
        message: e.to_string(),
    })?;
    let resources = project_dir.join(RESOURCES_DIR);
    let target = resources.join(format!("icon.{}", format.extension()));
    let write = async {
        tokio::fs::create_dir_all(&resources).await?;
        tokio::fs::write(&target, &asset.bytes).await
    };
    write.await.map_err(|e| MaterializeError::IconFailed {
        message: format!("{}: {e}", target.display()),
    })?;
    Ok(target)
}
