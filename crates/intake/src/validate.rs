//! Post-extraction content validation
//!
//! Normalizes the intake layout (single wrapper directory flattening),
//! guarantees a root `index.html`, and collects advisory findings.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;
use webforge_errors::{Error, IntakeError};
use webforge_types::ValidationReport;

use crate::content::advisory_findings;
use crate::paths::extension_of;

/// Name of the guaranteed entry document
pub const ENTRY_DOCUMENT: &str = "index.html";

/// Scratch name prefix used while hoisting a wrapper directory
const FLATTEN_SCRATCH: &str = ".webforge-flatten";

fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |e| Error::io_with_path(&e, path)
}

fn is_html(path: &Path) -> bool {
    matches!(extension_of(path).as_deref(), Some("html" | "htm"))
}

/// The single directory wrapping all content, if it directly holds HTML
fn wrapper_dir(root: &Path) -> Result<Option<PathBuf>, Error> {
    let mut entries = fs::read_dir(root)
        .map_err(io(root))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io(root))?;
    if entries.len() != 1 {
        return Ok(None);
    }
    let only = entries.remove(0);
    if !only.file_type().map_err(io(root))?.is_dir() {
        return Ok(None);
    }

    let dir = only.path();
    for child in fs::read_dir(&dir).map_err(io(&dir))? {
        let child = child.map_err(io(&dir))?;
        if child.file_type().map_err(io(&dir))?.is_file() && is_html(&child.path()) {
            return Ok(Some(dir));
        }
    }
    Ok(None)
}

/// Move the wrapper's children up one level and drop the wrapper
fn flatten(root: &Path, wrapper: &Path) -> Result<(), Error> {
    // Renaming first avoids a clash when the wrapper holds an entry of its own
    // name; the suffix keeps any child from landing on the scratch dir
    let scratch = root.join(format!("{FLATTEN_SCRATCH}-{}", Uuid::new_v4().simple()));
    fs::rename(wrapper, &scratch).map_err(io(wrapper))?;
    for child in fs::read_dir(&scratch).map_err(io(&scratch))? {
        let child = child.map_err(io(&scratch))?;
        let from = child.path();
        let to = root.join(child.file_name());
        fs::rename(&from, &to).map_err(io(&from))?;
    }
    fs::remove_dir(&scratch).map_err(io(&scratch))?;
    Ok(())
}

/// Every HTML file under `root`, relative, in stable sorted order
fn html_documents(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::internal(format!("walk failed: {e}")))?;
        if entry.file_type().is_file() && is_html(entry.path()) {
            if let Ok(relative) = entry.path().strip_prefix(root) {
                documents.push(relative.to_path_buf());
            }
        }
    }
    documents.sort();
    Ok(documents)
}

fn read_prefix(path: &Path, limit: u64) -> Result<String, Error> {
    let file = fs::File::open(path).map_err(io(path))?;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).map_err(io(path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Validate extracted content in place
pub(crate) fn validate_blocking(root: &Path, read_limit: u64) -> Result<ValidationReport, Error> {
    let mut report = ValidationReport::default();

    if let Some(wrapper) = wrapper_dir(root)? {
        flatten(root, &wrapper)?;
        report.flattened = true;
    }

    let documents = html_documents(root)?;
    let Some(first) = documents.first() else {
        return Err(IntakeError::NoEntryDocument.into());
    };

    let entry = root.join(ENTRY_DOCUMENT);
    if !entry.is_file() {
        let source = root.join(first);
        fs::copy(&source, &entry).map_err(io(&source))?;
        report.promoted_from = Some(first.clone());
    }
    report.entry_document = PathBuf::from(ENTRY_DOCUMENT);

    let source = read_prefix(&entry, read_limit)?;
    report.warnings = advisory_findings(&source);

    Ok(report)
}
