//! Age-based retention sweeper
//!
//! Every entry directly under the workspace and output roots is removed once
//! its modification time is older than the retention window. Stale install
//! staging directories in the cache root are reclaimed the same way. The
//! sweeper never touches the status tracker.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use webforge_builder::STAGING_PREFIX;
use webforge_config::Config;
use webforge_events::{AppEvent, EventEmitter, EventSender, SweepEvent};
use webforge_platform::fs as platform_fs;
use webforge_types::SweepReport;

/// Which entries of a root the sweeper may remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Everything,
    StagingOnly,
}

/// Periodic deletion of expired build directories
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    roots: Vec<(PathBuf, Scope)>,
    max_age: Duration,
    interval: Duration,
    tx: Option<EventSender>,
}

impl EventEmitter for RetentionSweeper {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(config: &Config, tx: Option<EventSender>) -> Self {
        Self {
            roots: vec![
                (config.workspaces_root(), Scope::Everything),
                (config.output_root(), Scope::Everything),
                (config.cache_root(), Scope::StagingOnly),
            ],
            max_age: config.retention_max_age(),
            interval: config.retention_interval(),
            tx,
        }
    }

    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass over every root, measured against the current time
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// One pass over every root, measured against `now`
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        self.emit(AppEvent::Sweep(SweepEvent::Started {
            roots: self.roots.iter().map(|(root, _)| root.clone()).collect(),
        }));

        let mut report = SweepReport::default();
        for (root, scope) in &self.roots {
            report.merge(self.sweep_root(root, *scope, now).await);
        }

        self.emit(AppEvent::Sweep(SweepEvent::Completed {
            scanned: report.scanned,
            removed: report.removed.len(),
            retained: report.retained,
            errors: report.errors.len(),
        }));
        report
    }

    async fn sweep_root(&self, root: &Path, scope: Scope, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let entries = match platform_fs::list_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                self.record_error(&mut report, root, &e.to_string());
                return report;
            }
        };

        for path in entries {
            if scope == Scope::StagingOnly && !is_staging(&path) {
                continue;
            }
            report.scanned += 1;

            let age = match platform_fs::modified_age(&path, now).await {
                Ok(age) => age,
                // Removed by someone else since the listing
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    self.record_error(&mut report, &path, &e.to_string());
                    continue;
                }
            };

            if age <= self.max_age {
                report.retained += 1;
                continue;
            }

            match platform_fs::remove_path(&path).await {
                Ok(()) => {
                    self.emit(AppEvent::Sweep(SweepEvent::Removed {
                        path: path.clone(),
                        age_secs: age.as_secs(),
                    }));
                    report.removed.push(path);
                }
                Err(e) => self.record_error(&mut report, &path, &e.to_string()),
            }
        }
        report
    }

    fn record_error(&self, report: &mut SweepReport, path: &Path, message: &str) {
        self.emit(AppEvent::Sweep(SweepEvent::Error {
            path: path.to_path_buf(),
            message: message.to_string(),
        }));
        report.errors.push(format!("{}: {message}", path.display()));
    }

    /// Sweep on every interval tick until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Run on a background task
    #[must_use]
    pub fn spawn(self) -> SweeperHandle {
        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown));
        SweeperHandle { stop, task }
    }
}

fn is_staging(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(STAGING_PREFIX))
}

/// Handle to a running sweeper task
#[derive(Debug)]
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit; an in-flight pass finishes first
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
