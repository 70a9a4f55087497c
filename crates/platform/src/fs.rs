//! Filesystem helpers shared by the pipeline stages.
//!
//! All functions return `webforge_errors::Error` with the offending path
//! attached so failures can be traced to a concrete workspace.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use webforge_errors::{Error, PlatformError};

/// Result type for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| Error::io_with_path(&e, path)
}

/// Recursively copy a directory
///
/// Symbolic links are recreated as links on unix (dependency trees use
/// them for `.bin` shims) and skipped elsewhere.
///
/// # Errors
///
/// Returns an error if:
/// - Creating the destination directory fails
/// - Reading the source directory fails
/// - Copying any file or subdirectory fails
pub async fn copy_directory(src: &Path, dst: &Path) -> Result<u64> {
    fs::create_dir_all(dst).await.map_err(io_err(dst))?;

    let mut copied = 0u64;
    let mut entries = fs::read_dir(src).await.map_err(io_err(src))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err(src))? {
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        let file_type = entry.file_type().await.map_err(io_err(&src_path))?;
        if file_type.is_dir() {
            copied += Box::pin(copy_directory(&src_path, &dst_path)).await?;
        } else if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path).await?;
        } else {
            copied += fs::copy(&src_path, &dst_path)
                .await
                .map_err(io_err(&src_path))?;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
async fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).await.map_err(io_err(src))?;
    fs::symlink(&target, dst).await.map_err(io_err(dst))
}

#[cfg(not(unix))]
async fn copy_symlink(_src: &Path, _dst: &Path) -> Result<()> {
    Ok(())
}

/// Copy a single file, creating the destination's parent directories
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the copy fails.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        create_dir_all(parent).await?;
    }
    fs::copy(src, dst).await.map_err(io_err(src))
}

/// Create a directory with all parent directories
///
/// # Errors
///
/// Returns an error if permission is denied or any I/O operation fails.
pub async fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await.map_err(io_err(path))
}

/// Remove a directory tree; a missing path counts as removed
///
/// # Errors
///
/// Returns an error for any failure other than `NotFound`.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_with_path(&e, path)),
    }
}

/// Remove whatever is at `path` (file, link or directory); missing is fine
///
/// # Errors
///
/// Returns an error for any failure other than `NotFound`.
pub async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io_with_path(&e, path)),
    };
    if metadata.is_dir() {
        remove_dir_all(path).await
    } else {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io_with_path(&e, path)),
        }
    }
}

/// Ensure a directory exists and is empty
///
/// # Errors
///
/// Returns an error if removal or creation fails.
pub async fn ensure_empty_dir(path: &Path) -> Result<()> {
    remove_dir_all(path).await?;
    create_dir_all(path).await
}

/// Rename a file or directory
///
/// # Errors
///
/// Returns an error if the rename fails (permissions, cross-device, etc.)
pub async fn rename(src: &Path, dst: &Path) -> Result<()> {
    fs::rename(src, dst).await.map_err(|e| {
        PlatformError::FilesystemOperationFailed {
            operation: "rename".to_string(),
            message: format!("{} -> {}: {e}", src.display(), dst.display()),
        }
        .into()
    })
}

/// Check if a path exists
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Time elapsed since `path` was last modified, measured against `now`
///
/// A modification time in the future yields zero.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read; a vanished path yields
/// an `Io` error with kind `NotFound`.
pub async fn modified_age(path: &Path, now: SystemTime) -> Result<Duration> {
    let metadata = fs::symlink_metadata(path).await.map_err(io_err(path))?;
    let modified = metadata.modified().map_err(io_err(path))?;
    Ok(now.duration_since(modified).unwrap_or(Duration::ZERO))
}

/// Immediate children of `dir`; a missing directory has none
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io_with_path(&e, dir)),
    };
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err(dir))? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}
