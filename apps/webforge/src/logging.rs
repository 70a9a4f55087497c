//! Structured logging integration for events
//!
//! Every event that reaches the CLI is also written as a tracing record, with
//! the event's metadata attached as structured fields.

use webforge_events::{AppEvent, CacheEvent, EventMessage, GeneralEvent, PipelineEvent, SweepEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` through tracing at the level its metadata carries
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();

    match event {
        AppEvent::Pipeline(pipeline_event) => match pipeline_event {
            PipelineEvent::Submitted { build_id, app_name } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    build_id = %build_id,
                    app_name = %app_name,
                    "Build submitted"
                );
            }
            PipelineEvent::PhaseChanged {
                build_id,
                from,
                to,
                note,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    build_id = %build_id,
                    from = %from,
                    to = %to,
                    note = %note,
                    "Build phase changed"
                );
            }
            PipelineEvent::Completed {
                build_id,
                artifact,
                duration,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    build_id = %build_id,
                    artifact = %artifact.display(),
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "Build completed"
                );
            }
            PipelineEvent::Failed {
                build_id,
                phase,
                failure,
                diagnostics,
            } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    build_id = %build_id,
                    phase = %phase,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    diagnostics = ?diagnostics,
                    "Build failed"
                );
            }
            PipelineEvent::CleanupFailed {
                build_id,
                path,
                message,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    build_id = %build_id,
                    path = %path.display(),
                    message = %message,
                    "Workspace cleanup failed"
                );
            }
        },

        AppEvent::Cache(CacheEvent::Promoted { hash, evicted }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                hash = %hash,
                evicted = evicted,
                "Dependency cache entry promoted"
            );
        }
        AppEvent::Cache(CacheEvent::Fallback { reason }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                reason = %reason,
                "Dependency cache unavailable, installing directly"
            );
        }

        AppEvent::Sweep(SweepEvent::Completed {
            scanned,
            removed,
            retained,
            errors,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                scanned = scanned,
                removed = removed,
                retained = retained,
                errors = errors,
                "Retention sweep completed"
            );
        }

        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                context = ?context,
                "Warning"
            );
        }
        AppEvent::General(GeneralEvent::Error { message, details }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                details = ?details,
                "Error"
            );
        }
        AppEvent::General(GeneralEvent::DebugLog { message, context }) => {
            debug!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                correlation = ?meta.correlation_id,
                message = %message,
                context = ?context,
                "Debug log"
            );
        }

        _ => match level {
            tracing::Level::ERROR => {
                error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::WARN => {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::INFO => {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::DEBUG => {
                debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::TRACE => {
                trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
        },
    }
}

/// Initialize the tracing subscriber.
///
/// JSON mode keeps stdout clean for the result document, so logs go to
/// stderr only when debugging was asked for.
pub fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    use tracing_subscriber::EnvFilter;

    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = |fallback: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };

    if debug_enabled {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("info,webforge=debug,webforge_ops=debug"))
            .init();
    } else if json_mode {
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn,webforge=warn,webforge_ops=warn"))
            .init();
    }
}
