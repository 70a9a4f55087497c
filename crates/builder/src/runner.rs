//! Subprocess build runner
//!
//! Runs the packager inside a materialized project, finds the executables it
//! produced and publishes copies into the per-build output directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};
use webforge_config::Config;
use webforge_errors::{BuildError, Error};
use webforge_events::EventEmitter;
use webforge_platform::fs as platform_fs;
use webforge_platform::{PlatformContext, ProcessOperations};
use webforge_types::OutputArtifacts;

use crate::toolchain::{exit_summary, ToolCommand};

/// Suffix of the packager's unpacked staging directories, never artifacts
const UNPACKED_SUFFIX: &str = "-unpacked";

/// Drives the external packager
pub struct BuildRunner {
    process: Arc<dyn ProcessOperations>,
    install: ToolCommand,
    package: ToolCommand,
    output_dir: String,
    fallback_dirs: Vec<String>,
    extension: String,
}

impl std::fmt::Debug for BuildRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildRunner")
            .field("package", &self.package.program)
            .field("output_dir", &self.output_dir)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl BuildRunner {
    #[must_use]
    pub fn new(config: &Config, process: Arc<dyn ProcessOperations>) -> Self {
        Self {
            process,
            install: ToolCommand::install(config),
            package: ToolCommand::package(config),
            output_dir: config.build.output_dir.clone(),
            fallback_dirs: config.build.fallback_dirs.clone(),
            extension: config
                .build
                .artifact_extension
                .trim_start_matches('.')
                .to_string(),
        }
    }

    /// Install dependencies directly in the project, bypassing the cache
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InstallFailed` if the package manager cannot run
    /// or exits non-zero.
    pub async fn install_direct(&self, ctx: &PlatformContext, project_dir: &Path) -> Result<(), Error> {
        let output = self
            .process
            .execute_command(ctx, self.install.command_in(project_dir))
            .await
            .map_err(|e| BuildError::InstallFailed {
                message: e.to_string(),
            })?;
        if output.success() {
            Ok(())
        } else {
            Err(BuildError::InstallFailed {
                message: exit_summary(&output),
            }
            .into())
        }
    }

    /// Run the packager and locate what it produced.
    ///
    /// The returned artifacts still live inside the project.
    ///
    /// # Errors
    ///
    /// - `BuildError::CommandFailed` for a non-zero exit, carrying the stderr tail
    /// - `BuildError::Timeout` when the wall-clock limit elapsed (the process
    ///   group has been killed)
    /// - `BuildError::ToolNotFound` when the packager is not installed
    /// - `BuildError::NoArtifactsProduced` when the packager succeeded but no
    ///   file with the target extension exists
    pub async fn build(&self, ctx: &PlatformContext, project_dir: &Path) -> Result<OutputArtifacts, Error> {
        let cmd = self.package.command_in(project_dir);
        let command = cmd.display_line();
        let output = self
            .process
            .execute_command(ctx, cmd)
            .await
            .map_err(|e| match e {
                Error::Platform(platform) => Error::Build(platform.into()),
                other => other,
            })?;

        if !output.success() {
            return Err(BuildError::CommandFailed {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr_lossy(),
            }
            .into());
        }
        if output.truncated_bytes > 0 {
            ctx.emit_debug(format!(
                "packager output truncated by {} bytes",
                output.truncated_bytes
            ));
        }

        let project = project_dir.to_path_buf();
        let directories = self.search_dirs();
        let extension = self.extension.clone();
        let located = tokio::task::spawn_blocking(move || {
            locate_artifacts(&project, &directories, &extension)
        })
        .await
        .map_err(|e| Error::internal(format!("artifact search failed: {e}")))?;

        located.ok_or_else(|| {
            BuildError::NoArtifactsProduced {
                extension: self.extension.clone(),
                output: output.diagnostics(),
            }
            .into()
        })
    }

    fn search_dirs(&self) -> Vec<String> {
        std::iter::once(self.output_dir.clone())
            .chain(self.fallback_dirs.iter().cloned())
            .collect()
    }

    /// Copy located artifacts into `output_dir`; sources are left in place.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::DistributionFailed` if any copy fails.
    pub async fn publish(
        &self,
        artifacts: &OutputArtifacts,
        output_dir: &Path,
    ) -> Result<OutputArtifacts, Error> {
        let distribution_failed = |e: Error| -> Error {
            BuildError::DistributionFailed {
                message: e.to_string(),
            }
            .into()
        };

        platform_fs::create_dir_all(output_dir)
            .await
            .map_err(distribution_failed)?;

        let mut published = Vec::with_capacity(artifacts.files.len());
        for source in &artifacts.files {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = output_dir.join(name);
            platform_fs::copy_file(source, &target)
                .await
                .map_err(distribution_failed)?;
            published.push(target);
        }

        if published.is_empty() {
            return Err(BuildError::NoArtifactsProduced {
                extension: self.extension.clone(),
                output: String::new(),
            }
            .into());
        }

        Ok(OutputArtifacts {
            files: published,
            found_in: artifacts.found_in.clone(),
        })
    }
}

fn is_unpacked_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(UNPACKED_SUFFIX))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Search each directory in order; the first one holding matches wins.
///
/// Matches are ordered shallowest first, then by path, and deduplicated by
/// file name.
fn locate_artifacts(project: &Path, directories: &[String], extension: &str) -> Option<OutputArtifacts> {
    for directory in directories {
        let root = project.join(directory);
        if !root.is_dir() {
            continue;
        }

        let mut matches: Vec<(usize, PathBuf)> = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_unpacked_dir(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), extension))
            .map(|entry| (entry.depth(), entry.into_path()))
            .collect();
        matches.sort();

        let mut seen = HashSet::new();
        let files: Vec<PathBuf> = matches
            .into_iter()
            .map(|(_, path)| path)
            .filter(|path| seen.insert(path.file_name().map(std::ffi::OsStr::to_os_string)))
            .collect();

        if !files.is_empty() {
            return Some(OutputArtifacts {
                files,
                found_in: root,
            });
        }
    }
    None
}
