//! Source expansion: turning a directory spec into concrete image files.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{PipelineError, PipelineResult};
use crate::types::SUPPORTED_EXTENSIONS;

use super::path::get_extension;

/// Subtrees whose path contains this marker (case-insensitive) are skipped.
const ARCHIVE_ARTIFACT_MARKER: &str = "__MACOSX";

/// Recursively expands source directories.
pub struct SourceExpander {
    supported_formats: Vec<String>,
}

/// A file found under a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path relative to the expanded root, `/`-separated
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
}

impl Default for SourceExpander {
    fn default() -> Self {
        Self::new(SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect())
    }
}

impl SourceExpander {
    /// Create an expander accepting the given extensions.
    pub fn new(supported_formats: Vec<String>) -> Self {
        Self { supported_formats }
    }

    /// List every supported file under `dir`, sorted by path.
    ///
    /// Fails with [`PipelineError::Scan`] if any directory in the tree cannot
    /// be read.
    pub fn expand_files(&self, dir: &Path) -> PipelineResult<Vec<SourceEntry>> {
        let mut files = Vec::new();

        for entry in walk(dir) {
            let entry = entry.map_err(|e| scan_error(dir, e))?;
            if entry.file_type().is_dir() || !self.is_supported(entry.path()) {
                continue;
            }
            files.push(SourceEntry {
                name: relative_name(dir, entry.path()),
                path: entry.path().to_path_buf(),
            });
        }

        Ok(files)
    }

    /// List every directory below `dir` (excluding `dir` itself).
    ///
    /// Used for dependency registration only.
    pub fn expand_subfolders(&self, dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        let mut folders = Vec::new();

        for entry in walk(dir) {
            let entry = entry.map_err(|e| scan_error(dir, e))?;
            if entry.depth() > 0 && entry.file_type().is_dir() {
                folders.push(entry.path().to_path_buf());
            }
        }

        Ok(folders)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        let ext = get_extension(path);
        self.supported_formats
            .iter()
            .any(|fmt| fmt.eq_ignore_ascii_case(&ext))
    }
}

fn walk(dir: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_archive_artifact(e))
}

fn is_archive_artifact(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .path()
            .to_string_lossy()
            .to_uppercase()
            .contains(ARCHIVE_ARTIFACT_MARKER)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn scan_error(root: &Path, err: walkdir::Error) -> PipelineError {
    PipelineError::Scan {
        path: err.path().unwrap_or(root).to_path_buf(),
        message: err.to_string(),
    }
}
