//! Archive entry path normalization
//!
//! Entry names come from an untrusted central directory. They are reduced to
//! a relative path made only of normal components before anything touches
//! the filesystem.

use std::path::{Component, Path, PathBuf};
use webforge_errors::IntakeError;

/// Platform metadata that is dropped silently
const METADATA_DIRS: &[&str] = &["__MACOSX"];
const METADATA_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

fn unsafe_path(path: &str, reason: &str) -> IntakeError {
    IntakeError::UnsafePath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Normalize a raw entry name into a path relative to the intake root.
///
/// Backslashes become separators, leading separators are stripped, `.` is
/// dropped and `..` pops the previous segment. Returns `Ok(None)` when the
/// name resolves to the root itself.
///
/// # Errors
///
/// Returns `IntakeError::UnsafePath` for drive prefixes, NUL bytes, and
/// any `..` that would climb above the root.
pub fn normalize_entry_path(raw: &str) -> Result<Option<PathBuf>, IntakeError> {
    if raw.contains('\0') {
        return Err(unsafe_path(raw, "NUL byte in entry name"));
    }

    let unified = raw.replace('\\', "/");
    let trimmed = unified.trim_start_matches('/');

    let mut segments: Vec<&str> = Vec::new();
    for (index, segment) in trimmed.split('/').enumerate() {
        if index == 0 && is_drive_prefix(segment) {
            return Err(unsafe_path(raw, "drive prefix not allowed"));
        }
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(unsafe_path(raw, "path escapes the archive root"));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(segments.iter().collect()))
}

/// Join a normalized relative path onto `root`, re-checking containment.
///
/// # Errors
///
/// Returns `IntakeError::UnsafePath` if the result is not a descendant of
/// `root`.
pub fn resolve_within(root: &Path, relative: &Path) -> Result<PathBuf, IntakeError> {
    let only_normal = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    let joined = root.join(relative);
    if !only_normal || !joined.starts_with(root) || joined == root {
        return Err(unsafe_path(
            &relative.display().to_string(),
            "resolved path leaves the intake directory",
        ));
    }
    Ok(joined)
}

/// Whether the entry is OS metadata (`__MACOSX/…`, `.DS_Store`, `Thumbs.db`)
#[must_use]
pub fn is_platform_metadata(relative: &Path) -> bool {
    let mut components = relative.components().peekable();
    while let Some(Component::Normal(name)) = components.next() {
        let name = name.to_string_lossy();
        if METADATA_DIRS.iter().any(|dir| *dir == name) {
            return true;
        }
        if components.peek().is_none() && METADATA_FILES.iter().any(|file| *file == name) {
            return true;
        }
    }
    false
}

/// Lowercased final extension of a path, if any
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}
