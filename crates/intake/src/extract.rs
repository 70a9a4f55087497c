//! Zip extraction into an isolated intake directory
//!
//! Runs on the blocking pool. Every entry is checked in a first pass over
//! the central directory (sizes, names, types) so nothing is written for an
//! archive that is rejected up front. The second pass writes entries and
//! enforces the per-entry cap again on the actual byte stream.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use webforge_errors::{Error, IntakeError};
use webforge_types::ExtractedFileList;
use zip::ZipArchive;

use crate::paths::{extension_of, is_platform_metadata, normalize_entry_path, resolve_within};
use crate::IntakeLimits;

/// What to do with one central-directory entry
enum Planned {
    Directory(PathBuf),
    File { index: usize, relative: PathBuf },
}

fn invalid(message: impl Into<String>) -> Error {
    IntakeError::InvalidArchive {
        message: message.into(),
    }
    .into()
}

/// Walk the central directory and reject the archive before writing anything
fn plan_entries<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    limits: &IntakeLimits,
    skipped: &mut usize,
) -> Result<Vec<Planned>, Error> {
    let mut planned = Vec::with_capacity(archive.len());
    let mut declared_total = 0u64;

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();

        let Some(relative) = normalize_entry_path(&name)? else {
            continue;
        };

        if is_platform_metadata(&relative) {
            *skipped += 1;
            continue;
        }

        if entry.is_symlink() {
            return Err(IntakeError::UnsafePath {
                path: name,
                reason: "symbolic links are not allowed".to_string(),
            }
            .into());
        }

        if entry.is_dir() {
            planned.push(Planned::Directory(relative));
            continue;
        }

        if let Some(extension) = extension_of(&relative) {
            if limits.is_blocked(&extension) {
                return Err(IntakeError::DisallowedType {
                    path: relative.display().to_string(),
                    extension,
                }
                .into());
            }
        }

        let size = entry.size();
        if size > limits.max_entry_bytes {
            return Err(IntakeError::EntryTooLarge {
                path: relative.display().to_string(),
                size,
                limit: limits.max_entry_bytes,
            }
            .into());
        }

        declared_total = declared_total.saturating_add(size);
        if declared_total > limits.max_archive_bytes {
            return Err(IntakeError::TooLarge {
                size: declared_total,
                limit: limits.max_archive_bytes,
            }
            .into());
        }

        planned.push(Planned::File { index, relative });
    }

    Ok(planned)
}

/// Copy at most `limit` bytes; one byte more means the header lied
fn copy_bounded<R: Read>(
    reader: &mut R,
    out: &mut File,
    relative: &Path,
    limit: u64,
) -> Result<u64, Error> {
    let written = io::copy(&mut reader.take(limit + 1), out)?;
    if written > limit {
        return Err(IntakeError::EntryTooLarge {
            path: relative.display().to_string(),
            size: written,
            limit,
        }
        .into());
    }
    Ok(written)
}

fn extract_planned(
    archive_bytes: &[u8],
    root: &Path,
    limits: &IntakeLimits,
) -> Result<ExtractedFileList, Error> {
    let raw_len = archive_bytes.len() as u64;
    if raw_len > limits.max_archive_bytes {
        return Err(IntakeError::TooLarge {
            size: raw_len,
            limit: limits.max_archive_bytes,
        }
        .into());
    }

    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| invalid(format!("not a readable zip archive: {e}")))?;

    let mut report = ExtractedFileList::default();
    let planned = plan_entries(&mut archive, limits, &mut report.skipped)?;

    if !planned.iter().any(|p| matches!(p, Planned::File { .. })) {
        return Err(IntakeError::EmptyArchive.into());
    }

    for plan in planned {
        match plan {
            Planned::Directory(relative) => {
                let target = resolve_within(root, &relative)?;
                fs::create_dir_all(&target).map_err(|e| Error::io_with_path(&e, &target))?;
            }
            Planned::File { index, relative } => {
                let target = resolve_within(root, &relative)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
                }

                let mut entry = archive.by_index(index)?;
                let mut out =
                    File::create(&target).map_err(|e| Error::io_with_path(&e, &target))?;
                let written =
                    copy_bounded(&mut entry, &mut out, &relative, limits.max_entry_bytes)?;

                report.total_bytes += written;
                if report.total_bytes > limits.max_archive_bytes {
                    return Err(IntakeError::TooLarge {
                        size: report.total_bytes,
                        limit: limits.max_archive_bytes,
                    }
                    .into());
                }
                report.files.push(relative);
            }
        }
    }

    report.files.sort();
    Ok(report)
}

/// Extract `archive_bytes` into `root`, which must not contain prior content.
///
/// On any failure the whole `root` directory is removed.
pub(crate) fn extract_blocking(
    archive_bytes: &[u8],
    root: &Path,
    limits: &IntakeLimits,
) -> Result<ExtractedFileList, Error> {
    fs::create_dir_all(root).map_err(|e| Error::io_with_path(&e, root))?;

    let result = extract_planned(archive_bytes, root, limits);
    if result.is_err() {
        // Best effort; the error being returned matters more
        let _ = fs::remove_dir_all(root);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_bounded_rejects_streams_longer_than_declared() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = File::create(dir.path().join("out.bin")).unwrap();
        let mut lying = Cursor::new(vec![7u8; 11]);
        let err = copy_bounded(&mut lying, &mut out, Path::new("out.bin"), 10).unwrap_err();
        assert!(matches!(
            err,
            Error::Intake(IntakeError::EntryTooLarge { size: 11, limit: 10, .. })
        ));
    }

    #[test]
    fn copy_bounded_accepts_exact_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = File::create(dir.path().join("out.bin")).unwrap();
        let mut exact = Cursor::new(vec![7u8; 10]);
        assert_eq!(
            copy_bounded(&mut exact, &mut out, Path::new("out.bin"), 10).unwrap(),
            10
        );
    }
}
