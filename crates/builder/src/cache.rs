//! Shared dependency cache
//!
//! One installed dependency tree is kept under `<cache_root>/<hash>/`, keyed
//! by the BLAKE3 hash of the canonical dependency manifest. Installs happen in
//! a private staging directory and become visible through a single rename;
//! the `.complete` marker is written before that rename, so an entry that is
//! visible is always whole.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use webforge_config::constants::CACHE_COMPLETE_MARKER;
use webforge_config::Config;
use webforge_errors::{CacheError, Error};
use webforge_events::{AppEvent, CacheEvent, EventEmitter};
use webforge_hash::Hash;
use webforge_platform::fs as platform_fs;
use webforge_platform::{PlatformContext, ProcessOperations};

use crate::manifest::DependencyManifest;
use crate::toolchain::{exit_summary, ToolCommand};

/// Prefix of in-progress install directories inside the cache root
pub const STAGING_PREFIX: &str = ".tmp-";

/// A usable cache entry
#[derive(Debug, Clone)]
pub struct CacheHandle {
    pub hash: Hash,
    /// Entry directory, `<cache_root>/<hash>`
    pub path: PathBuf,
    /// True when the entry already existed and no install ran
    pub warm: bool,
}

/// Hash-keyed cache of installed build dependencies
pub struct DependencyCache {
    root: PathBuf,
    enabled: bool,
    manifest_file: String,
    dependency_dir: String,
    install: ToolCommand,
    process: Arc<dyn ProcessOperations>,
    install_locks: DashMap<String, Arc<Mutex<()>>>,
    promotion: Mutex<()>,
}

impl std::fmt::Debug for DependencyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyCache")
            .field("root", &self.root)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl DependencyCache {
    #[must_use]
    pub fn new(config: &Config, process: Arc<dyn ProcessOperations>) -> Self {
        Self {
            root: config.cache_root(),
            enabled: config.cache.enabled,
            manifest_file: config.cache.manifest_file.clone(),
            dependency_dir: config.cache.dependency_dir.clone(),
            install: ToolCommand::install(config),
            process,
            install_locks: DashMap::new(),
            promotion: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn entry_path(&self, hash: &Hash) -> PathBuf {
        self.root.join(hash.to_hex())
    }

    async fn is_complete(&self, hash: &Hash) -> bool {
        platform_fs::exists(&self.entry_path(hash).join(CACHE_COMPLETE_MARKER)).await
    }

    fn hit(&self, ctx: &PlatformContext, hash: Hash) -> CacheHandle {
        ctx.emit(AppEvent::Cache(CacheEvent::Hit {
            hash: hash.to_hex(),
        }));
        CacheHandle {
            hash,
            path: self.entry_path(&hash),
            warm: true,
        }
    }

    /// Make sure an entry for `manifest` exists, installing it if needed.
    ///
    /// Concurrent calls for the same manifest run at most one install; the
    /// others wait and then see the warm entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Disabled` when caching is off,
    /// `CacheError::InstallFailed` if the package manager fails and
    /// `CacheError::PromotionFailed` if the staged install cannot be moved
    /// into place.
    pub async fn ensure(
        &self,
        ctx: &PlatformContext,
        manifest: &DependencyManifest,
    ) -> Result<CacheHandle, Error> {
        if !self.enabled {
            return Err(CacheError::Disabled.into());
        }

        let hash = manifest.hash();
        if self.is_complete(&hash).await {
            return Ok(self.hit(ctx, hash));
        }

        let lock = Arc::clone(
            self.install_locks
                .entry(hash.to_hex())
                .or_default()
                .value(),
        );
        let _guard = lock.lock().await;

        // Another build may have finished the install while we waited
        if self.is_complete(&hash).await {
            return Ok(self.hit(ctx, hash));
        }

        ctx.emit(AppEvent::Cache(CacheEvent::Miss {
            hash: hash.to_hex(),
        }));

        let staging = self.root.join(format!(
            "{STAGING_PREFIX}{}-{}",
            hash.short(),
            Uuid::new_v4().simple()
        ));

        if let Err(error) = self.install_into(ctx, &staging, manifest).await {
            let _ = platform_fs::remove_dir_all(&staging).await;
            return Err(error);
        }

        if let Err(error) = self.promote(ctx, &hash, &staging).await {
            let _ = platform_fs::remove_dir_all(&staging).await;
            return Err(error);
        }

        Ok(CacheHandle {
            hash,
            path: self.entry_path(&hash),
            warm: false,
        })
    }

    async fn install_into(
        &self,
        ctx: &PlatformContext,
        staging: &Path,
        manifest: &DependencyManifest,
    ) -> Result<(), Error> {
        let install_failed = |message: String| -> Error { CacheError::InstallFailed { message }.into() };

        platform_fs::create_dir_all(staging).await?;
        let manifest_path = staging.join(&self.manifest_file);
        tokio::fs::write(&manifest_path, manifest.content())
            .await
            .map_err(|e| Error::io_with_path(&e, &manifest_path))?;

        let output = self
            .process
            .execute_command(ctx, self.install.command_in(staging))
            .await
            .map_err(|e| install_failed(e.to_string()))?;
        if !output.success() {
            return Err(install_failed(exit_summary(&output)));
        }

        // A manifest without dependencies installs nothing
        platform_fs::create_dir_all(&staging.join(&self.dependency_dir)).await?;

        let marker = staging.join(CACHE_COMPLETE_MARKER);
        tokio::fs::write(&marker, manifest.hash().to_hex())
            .await
            .map_err(|e| Error::io_with_path(&e, &marker))?;
        Ok(())
    }

    /// Move a finished install into place and evict every other entry
    async fn promote(&self, ctx: &PlatformContext, hash: &Hash, staging: &Path) -> Result<(), Error> {
        let promotion_failed = |message: String| -> Error {
            CacheError::PromotionFailed {
                hash: hash.short(),
                message,
            }
            .into()
        };

        let _guard = self.promotion.lock().await;
        let target = self.entry_path(hash);

        // Leftover without a marker from an interrupted run
        platform_fs::remove_dir_all(&target)
            .await
            .map_err(|e| promotion_failed(e.to_string()))?;
        platform_fs::rename(staging, &target)
            .await
            .map_err(|e| promotion_failed(e.to_string()))?;

        let current = hash.to_hex();
        let mut evicted = 0;
        for path in platform_fs::list_dir(&self.root).await? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == current || !Hash::is_hex_name(name) {
                continue;
            }
            match platform_fs::remove_dir_all(&path).await {
                Ok(()) => {
                    evicted += 1;
                    self.install_locks.remove(name);
                }
                Err(e) => ctx.emit_warning_with_context(
                    "failed to evict stale cache entry",
                    format!("{}: {e}", path.display()),
                ),
            }
        }

        ctx.emit(AppEvent::Cache(CacheEvent::Promoted {
            hash: current,
            evicted,
        }));
        Ok(())
    }

    /// Give `project_dir` a private copy of the cached dependency tree.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::CopyFailed` if the copy cannot be completed, for
    /// example because the entry was evicted mid-copy. The partial copy is
    /// removed.
    pub async fn copy_into(
        &self,
        ctx: &PlatformContext,
        handle: &CacheHandle,
        project_dir: &Path,
    ) -> Result<u64, Error> {
        let source = handle.path.join(&self.dependency_dir);
        let destination = project_dir.join(&self.dependency_dir);

        let copied = async {
            if !platform_fs::exists(&source).await {
                return Err(Error::internal(format!(
                    "cache entry {} has no {}",
                    handle.hash.short(),
                    self.dependency_dir
                )));
            }
            platform_fs::remove_dir_all(&destination).await?;
            platform_fs::copy_directory(&source, &destination).await
        }
        .await;

        match copied {
            Ok(bytes) => {
                ctx.emit(AppEvent::Cache(CacheEvent::Copied {
                    hash: handle.hash.to_hex(),
                    destination,
                }));
                Ok(bytes)
            }
            Err(error) => {
                let _ = platform_fs::remove_dir_all(&destination).await;
                Err(CacheError::CopyFailed {
                    message: error.to_string(),
                }
                .into())
            }
        }
    }
}
