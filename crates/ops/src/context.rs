//! Operations context for dependency injection

use std::path::PathBuf;
use std::sync::Arc;

use webforge_builder::{BuildRunner, DependencyCache, ProjectMaterializer};
use webforge_config::Config;
use webforge_errors::{ConfigError, Error};
use webforge_events::{EventEmitter, EventSender};
use webforge_intake::{ArchiveIntake, IntakeLimits};
use webforge_platform::{NativeProcessOperations, PlatformContext, ProcessOperations};
use webforge_state::{MemoryStatusStore, StatusStore, StatusTracker};
use webforge_types::BuildId;

const INTAKE_DIR: &str = "intake";
const PROJECT_DIR: &str = "project";

/// On-disk locations for one build
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    workspaces_root: PathBuf,
    output_root: PathBuf,
}

impl WorkspaceLayout {
    #[must_use]
    pub fn new(workspaces_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            workspaces_root: workspaces_root.into(),
            output_root: output_root.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.workspaces_root(), config.output_root())
    }

    #[must_use]
    pub fn workspaces_root(&self) -> &PathBuf {
        &self.workspaces_root
    }

    #[must_use]
    pub fn output_root(&self) -> &PathBuf {
        &self.output_root
    }

    /// `<workspaces_root>/<id>`
    #[must_use]
    pub fn workspace(&self, id: &BuildId) -> PathBuf {
        self.workspaces_root.join(id.to_string())
    }

    #[must_use]
    pub fn intake(&self, id: &BuildId) -> PathBuf {
        self.workspace(id).join(INTAKE_DIR)
    }

    #[must_use]
    pub fn project(&self, id: &BuildId) -> PathBuf {
        self.workspace(id).join(PROJECT_DIR)
    }

    /// `<output_root>/<id>`
    #[must_use]
    pub fn output(&self, id: &BuildId) -> PathBuf {
        self.output_root.join(id.to_string())
    }
}

/// Every component a pipeline needs
pub struct OpsCtx {
    pub config: Config,
    pub layout: WorkspaceLayout,
    pub tracker: StatusTracker,
    pub intake: ArchiveIntake,
    pub materializer: ProjectMaterializer,
    pub cache: DependencyCache,
    pub runner: BuildRunner,
    pub tx: Option<EventSender>,
}

impl OpsCtx {
    /// Platform context whose events carry the build id
    #[must_use]
    pub fn platform_for(&self, id: &BuildId) -> PlatformContext {
        PlatformContext::new(self.tx.clone()).with_correlation_id(id.to_string())
    }
}

impl EventEmitter for OpsCtx {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl std::fmt::Debug for OpsCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsCtx")
            .field("layout", &self.layout)
            .field("cache", &self.cache)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

/// Builder for [`OpsCtx`]
#[derive(Default)]
pub struct OpsContextBuilder {
    config: Option<Config>,
    tx: Option<EventSender>,
    process: Option<Arc<dyn ProcessOperations>>,
    store: Option<Arc<dyn StatusStore>>,
}

impl OpsContextBuilder {
    /// Create new context builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Replace the subprocess implementation (defaults to native processes)
    #[must_use]
    pub fn with_process_operations(mut self, process: Arc<dyn ProcessOperations>) -> Self {
        self.process = Some(process);
        self
    }

    /// Replace the status store (defaults to in-memory)
    #[must_use]
    pub fn with_status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if no configuration was supplied, the configuration
    /// is invalid, or the project template cannot be loaded.
    pub fn build(self) -> Result<OpsCtx, Error> {
        let config = self.config.ok_or_else(|| ConfigError::Invalid {
            message: "operations context requires a configuration".to_string(),
        })?;
        config.validate()?;

        let process = self
            .process
            .unwrap_or_else(|| Arc::new(NativeProcessOperations::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStatusStore::new()));

        Ok(OpsCtx {
            layout: WorkspaceLayout::from_config(&config),
            tracker: StatusTracker::new(store),
            intake: ArchiveIntake::new(IntakeLimits::from_config(&config)),
            materializer: ProjectMaterializer::from_config(&config)?,
            cache: DependencyCache::new(&config, Arc::clone(&process)),
            runner: BuildRunner::new(&config, process),
            tx: self.tx,
            config,
        })
    }
}
