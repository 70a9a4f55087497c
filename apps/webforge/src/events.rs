//! Event handling and progress display

use console::{style, Term};
use webforge_events::{AppEvent, CacheEvent, EventMessage, GeneralEvent, PipelineEvent, SweepEvent};

use crate::logging::log_event_with_tracing;

/// Turns pipeline events into terse status lines on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    quiet: bool,
}

impl EventHandler {
    /// `quiet` suppresses status lines; events are still logged
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);
        if self.quiet {
            return;
        }

        match &message.event {
            AppEvent::Pipeline(PipelineEvent::Submitted { build_id, app_name }) => {
                self.show_status(&format!("Build {build_id} accepted for {app_name}"));
            }
            AppEvent::Pipeline(PipelineEvent::PhaseChanged { to, note, .. }) => {
                self.show_status(&format!("{:<12} {note}", to.as_str()));
            }
            AppEvent::Pipeline(PipelineEvent::Completed {
                artifact, duration, ..
            }) => {
                self.show_success(&format!(
                    "Built {} in {:.1}s",
                    artifact.display(),
                    duration.as_secs_f64()
                ));
            }
            AppEvent::Pipeline(PipelineEvent::Failed {
                phase,
                failure,
                diagnostics,
                ..
            }) => {
                self.show_error(&format!("Failed during {phase}: {}", failure.message));
                if let Some(hint) = &failure.hint {
                    self.show_status(&format!("hint: {hint}"));
                }
                if self.debug_enabled {
                    if let Some(diagnostics) = diagnostics {
                        for line in diagnostics.lines() {
                            self.show_status(&format!("  | {line}"));
                        }
                    }
                }
            }
            AppEvent::Cache(CacheEvent::Hit { .. }) => {
                self.show_status("Reusing cached dependencies");
            }
            AppEvent::Cache(CacheEvent::Miss { .. }) => {
                self.show_status("Installing dependencies into the shared cache");
            }
            AppEvent::Cache(CacheEvent::Fallback { reason }) => {
                self.show_warning(&format!("Dependency cache unavailable ({reason}); installing directly"));
            }
            AppEvent::Intake(webforge_events::IntakeEvent::ContentWarning { message }) => {
                self.show_warning(message);
            }
            AppEvent::Sweep(SweepEvent::Removed { path, age_secs }) => {
                self.show_status(&format!(
                    "Removed {} ({}m old)",
                    path.display(),
                    age_secs / 60
                ));
            }
            AppEvent::Sweep(SweepEvent::Error { path, message }) => {
                self.show_warning(&format!("Could not sweep {}: {message}", path.display()));
            }
            AppEvent::General(GeneralEvent::Warning { message, context }) => match context {
                Some(context) => self.show_warning(&format!("{message}: {context}")),
                None => self.show_warning(message),
            },
            AppEvent::General(GeneralEvent::Error { message, .. }) => {
                self.show_error(message);
            }
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) if self.debug_enabled => {
                self.show_status(&format!("debug: {message}"));
            }
            _ => {}
        }
    }

    fn show_status(&self, message: &str) {
        let _ = self.term.write_line(message);
    }

    fn show_success(&self, message: &str) {
        let line = if self.colors_enabled {
            style(message).green().to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&line);
    }

    fn show_warning(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("warning:").yellow().bold())
        } else {
            format!("warning: {message}")
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, message: &str) {
        let line = if self.colors_enabled {
            format!("{} {message}", style("error:").red().bold())
        } else {
            format!("error: {message}")
        };
        let _ = self.term.write_line(&line);
    }
}
