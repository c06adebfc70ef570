//! Path classification helpers.
//!
//! Paths in image specs may point at files or directories that do not exist
//! yet (for example inside a generated tree), so classification falls back to
//! a name-based heuristic when the filesystem has nothing to say.

use std::path::Path;

/// Whether `path` exists on disk.
pub fn is_exists(path: &Path) -> bool {
    path.exists()
}

/// Whether `path` should be treated as a directory.
///
/// Existing paths are classified by `stat`. A missing path is a directory
/// when its final segment has no `.` in it.
pub fn is_folder(path: &Path) -> bool {
    if let Ok(meta) = std::fs::metadata(path) {
        return meta.is_dir();
    }
    let normalized = normalize_separators(&path.to_string_lossy());
    let name = normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    !name.contains('.')
}

/// Lower-cased text after the last `.` anywhere in the path.
///
/// The whole path is searched, not just the final segment, so a dotted
/// directory name above an extensionless file yields a bogus extension.
/// Returns an empty string when the path has no `.` at all.
pub fn get_extension(path: &Path) -> String {
    let path = path.to_string_lossy();
    match path.trim().rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Trim whitespace and turn `\` separators into `/`.
pub fn normalize_separators(path: &str) -> String {
    path.trim().replace('\\', "/")
}
