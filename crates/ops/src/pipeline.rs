//! One build, start to finish
//!
//! A pipeline runs sequentially inside its own task. Each stage advances the
//! status record first, so a status query always names the stage currently
//! running. Any error ends the pipeline in `FAILED`.

use std::time::Instant;

use webforge_builder::{IconAsset, MaterializedProject};
use webforge_errors::{Error, UserFacingError};
use webforge_events::{AppEvent, CacheEvent, EventEmitter, FailureContext, PipelineEvent};
use webforge_platform::fs as platform_fs;
use webforge_platform::PlatformContext;
use webforge_state::TransitionDetails;
use webforge_types::{AppConfig, BuildId, OutputArtifacts, Phase};

use crate::OpsCtx;

/// Route under which completed artifacts are served
pub const DOWNLOAD_PREFIX: &str = "/download";

/// Everything a pipeline needs from the submission
#[derive(Debug, Clone)]
pub struct BuildJob {
    pub id: BuildId,
    pub archive: Vec<u8>,
    pub icon: Option<IconAsset>,
    pub app: AppConfig,
}

/// Drive `job` through every phase.
///
/// The status record ends in `COMPLETED` or `FAILED`; the returned error is
/// the one recorded.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub async fn run_pipeline(ctx: &OpsCtx, job: BuildJob) -> Result<OutputArtifacts, Error> {
    let started = Instant::now();
    let id = job.id;
    let platform = ctx.platform_for(&id);

    match execute(ctx, &platform, job).await {
        Ok(artifacts) => {
            if let Some(primary) = artifacts.primary() {
                platform.emit(AppEvent::Pipeline(PipelineEvent::Completed {
                    build_id: id,
                    artifact: primary.clone(),
                    duration: started.elapsed(),
                }));
            }
            Ok(artifacts)
        }
        Err(error) => {
            record_failure(ctx, &platform, &id, &error).await;
            Err(error)
        }
    }
}

async fn execute(
    ctx: &OpsCtx,
    platform: &PlatformContext,
    job: BuildJob,
) -> Result<OutputArtifacts, Error> {
    let BuildJob {
        id,
        archive,
        icon,
        app,
    } = job;
    let intake_dir = ctx.layout.intake(&id);
    let project_dir = ctx.layout.project(&id);

    advance(ctx, platform, &id, TransitionDetails::default())?;
    ctx.intake.extract(platform, archive, &intake_dir).await?;

    advance(ctx, platform, &id, TransitionDetails::default())?;
    let report = ctx.intake.validate(platform, &intake_dir).await?;
    if !report.warnings.is_empty() {
        ctx.tracker.add_warnings(&id, &report.warnings)?;
    }

    advance(ctx, platform, &id, TransitionDetails::default())?;
    let project = ctx
        .materializer
        .materialize(platform, &intake_dir, &project_dir, &app, icon.as_ref())
        .await?;
    if !project.warnings.is_empty() {
        ctx.tracker.add_warnings(&id, &project.warnings)?;
    }

    advance(ctx, platform, &id, TransitionDetails::default())?;
    install_dependencies(ctx, platform, &project).await?;

    advance(
        ctx,
        platform,
        &id,
        TransitionDetails::default().with_estimated_time(ctx.config.build.estimated_time.clone()),
    )?;
    let located = ctx.runner.build(platform, &project.root).await?;

    advance(ctx, platform, &id, TransitionDetails::default())?;
    let published = ctx.runner.publish(&located, &ctx.layout.output(&id)).await?;

    let record = ctx.tracker.complete(&id, format!("{DOWNLOAD_PREFIX}/{id}"))?;
    emit_phase_change(platform, &id, Phase::Distributing, record.phase, record.note);
    Ok(published)
}

fn emit_phase_change(
    platform: &PlatformContext,
    id: &BuildId,
    from: Phase,
    to: Phase,
    note: Option<String>,
) {
    platform.emit(AppEvent::Pipeline(PipelineEvent::PhaseChanged {
        build_id: *id,
        from,
        to,
        note: note.unwrap_or_else(|| to.description().to_string()),
    }));
}

fn advance(
    ctx: &OpsCtx,
    platform: &PlatformContext,
    id: &BuildId,
    details: TransitionDetails,
) -> Result<(), Error> {
    let from = ctx
        .tracker
        .get(id)
        .map_or(Phase::Uploading, |record| record.phase);
    let record = ctx.tracker.advance(id, details)?;
    emit_phase_change(platform, id, from, record.phase, record.note);
    Ok(())
}

/// Populate the project's dependencies from the shared cache, falling back
/// to a direct install when the cache cannot serve this build.
async fn install_dependencies(
    ctx: &OpsCtx,
    platform: &PlatformContext,
    project: &MaterializedProject,
) -> Result<(), Error> {
    if !ctx.cache.is_enabled() {
        platform.emit_debug("dependency cache disabled; installing directly");
        return ctx.runner.install_direct(platform, &project.root).await;
    }

    let cached = match ctx.cache.ensure(platform, &project.manifest).await {
        Ok(handle) => ctx.cache.copy_into(platform, &handle, &project.root).await,
        Err(error) => Err(error),
    };

    match cached {
        Ok(_) => Ok(()),
        Err(error) => {
            platform.emit(AppEvent::Cache(CacheEvent::Fallback {
                reason: error.to_string(),
            }));
            ctx.runner.install_direct(platform, &project.root).await
        }
    }
}

async fn record_failure(ctx: &OpsCtx, platform: &PlatformContext, id: &BuildId, error: &Error) {
    let phase = ctx
        .tracker
        .get(id)
        .map_or(Phase::Uploading, |record| record.phase);

    if let Err(e) = ctx.tracker.fail(id, error.user_message()) {
        platform.emit_warning_with_context("could not record build failure", e.to_string());
    }

    let diagnostics = match error {
        Error::Build(build) => build.diagnostics().map(str::to_string),
        _ => None,
    };
    platform.emit(AppEvent::Pipeline(PipelineEvent::Failed {
        build_id: *id,
        phase,
        failure: FailureContext::from_error(error),
        diagnostics,
    }));

    if ctx.config.pipeline.retain_failed_workspaces {
        return;
    }
    for path in [ctx.layout.workspace(id), ctx.layout.output(id)] {
        if let Err(e) = platform_fs::remove_dir_all(&path).await {
            platform.emit(AppEvent::Pipeline(PipelineEvent::CleanupFailed {
                build_id: *id,
                path,
                message: e.to_string(),
            }));
        }
    }
}
