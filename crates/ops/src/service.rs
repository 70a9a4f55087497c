//! Public build service API
//!
//! This is the surface an HTTP layer (or the CLI) talks to: submit an
//! archive, poll status, fetch the finished executable, probe liveness.

use std::path::Path;
use std::sync::Arc;

use webforge_builder::IconAsset;
use webforge_errors::{Error, SubmitError};
use webforge_events::{AppEvent, EventEmitter, PipelineEvent};
use webforge_platform::fs as platform_fs;
use webforge_types::{ArtifactDownload, AppConfig, BuildId, BuildStatus, HealthReport, Phase};

use crate::coordinator::Coordinator;
use crate::pipeline::BuildJob;
use crate::OpsCtx;

/// One submission as received from a client
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub archive: Vec<u8>,
    pub icon: Option<IconAsset>,
    pub config: AppConfig,
}

/// Build orchestration service
#[derive(Debug)]
pub struct BuildService {
    ctx: Arc<OpsCtx>,
    coordinator: Coordinator,
}

impl BuildService {
    /// Start the service; must be called inside a tokio runtime
    #[must_use]
    pub fn start(ctx: OpsCtx) -> Self {
        let ctx = Arc::new(ctx);
        let coordinator = Coordinator::start(Arc::clone(&ctx));
        Self { ctx, coordinator }
    }

    #[must_use]
    pub fn context(&self) -> &OpsCtx {
        &self.ctx
    }

    /// Accept a submission and return its identifier immediately.
    ///
    /// Only cheap checks run here; the pipeline itself runs in the
    /// background and reports through [`BuildService::status`].
    ///
    /// # Errors
    ///
    /// Returns a `SubmitError` for oversize uploads, unsupported icons,
    /// invalid settings, or when the service is shutting down.
    pub fn submit(&self, request: SubmitRequest) -> Result<BuildId, Error> {
        let limits = &self.ctx.config.limits;
        if !self.coordinator.is_accepting() {
            return Err(SubmitError::ShuttingDown.into());
        }

        let archive_size = request.archive.len() as u64;
        if archive_size > limits.max_archive_bytes {
            return Err(SubmitError::ArchiveTooLarge {
                size: archive_size,
                limit: limits.max_archive_bytes,
            }
            .into());
        }

        if let Some(icon) = &request.icon {
            let icon_size = icon.bytes.len() as u64;
            if icon_size > limits.max_icon_bytes {
                return Err(SubmitError::IconTooLarge {
                    size: icon_size,
                    limit: limits.max_icon_bytes,
                }
                .into());
            }
            icon.format()?;
        }

        request.config.validate()?;

        let id = BuildId::new();
        let app_name = request.config.sanitized_name();
        self.ctx.tracker.register(id, app_name.clone())?;
        self.ctx
            .emit(AppEvent::Pipeline(PipelineEvent::Submitted { build_id: id, app_name }));

        let job = BuildJob {
            id,
            archive: request.archive,
            icon: request.icon,
            app: request.config,
        };
        if let Err(error) = self.coordinator.enqueue(job) {
            // Raced with shutdown after registering
            let _ = self.ctx.tracker.fail(&id, error.to_string());
            return Err(error);
        }
        Ok(id)
    }

    /// Current status; never waits on a running pipeline
    #[must_use]
    pub fn status(&self, id: &BuildId) -> BuildStatus {
        self.ctx.tracker.status(id)
    }

    /// Status for an identifier given as text
    #[must_use]
    pub fn status_of(&self, raw: &str) -> BuildStatus {
        self.ctx.tracker.lookup(raw)
    }

    /// The executable of a completed build.
    ///
    /// Returns `None` for unknown, running and failed builds, and for
    /// completed builds whose output has already been swept.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output directory exists but cannot be read.
    pub async fn artifact(&self, id: &BuildId) -> Result<Option<ArtifactDownload>, Error> {
        let Some(record) = self.ctx.tracker.get(id) else {
            return Ok(None);
        };
        if record.phase != Phase::Completed {
            return Ok(None);
        }

        let extension = self
            .ctx
            .config
            .build
            .artifact_extension
            .trim_start_matches('.');
        for path in platform_fs::list_dir(&self.ctx.layout.output(id)).await? {
            if !has_extension(&path, extension) {
                continue;
            }
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io_with_path(&e, &path)),
            };
            return Ok(Some(ArtifactDownload {
                filename: format!("{}.{extension}", record.app_name),
                size: metadata.len(),
                path,
            }));
        }
        Ok(None)
    }

    /// Liveness; independent of any build
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport::ok(env!("CARGO_PKG_VERSION"))
    }

    /// Stop accepting submissions and wait for running builds
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
