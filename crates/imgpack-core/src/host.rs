//! The boundary between the pipeline and the build system hosting it.
//!
//! A host hands the pipeline a [`BuildContext`] once per build pass. The
//! pipeline registers the paths it touched as dependencies and emits named
//! output buffers through it.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// A dependency container supplied by the host.
///
/// Hosts may back this with an ordered list or with a set; the pipeline does
/// not care which.
pub trait DependencySink {
    /// Record `path` as a dependency.
    fn append(&mut self, path: PathBuf);
}

impl DependencySink for Vec<PathBuf> {
    fn append(&mut self, path: PathBuf) {
        self.push(path);
    }
}

impl DependencySink for HashSet<PathBuf> {
    fn append(&mut self, path: PathBuf) {
        self.insert(path);
    }
}

impl DependencySink for BTreeSet<PathBuf> {
    fn append(&mut self, path: PathBuf) {
        self.insert(path);
    }
}

/// An emitted output buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    bytes: Arc<[u8]>,
}

impl Asset {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The asset contents.
    pub fn source(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the asset.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-pass context supplied by the host build system.
pub trait BuildContext {
    /// Container for individual file dependencies.
    fn file_dependencies(&mut self) -> &mut dyn DependencySink;

    /// Container for directory (context) dependencies.
    fn context_dependencies(&mut self) -> &mut dyn DependencySink;

    /// Receive an output buffer under a `/`-separated destination name.
    fn emit_asset(&mut self, name: String, asset: Asset);
}

/// An in-memory build pass.
///
/// File dependencies are kept as an ordered list and directory dependencies
/// as a set, mirroring the two container shapes hosts use.
#[derive(Debug, Default)]
pub struct Compilation {
    pub file_dependencies: Vec<PathBuf>,
    pub context_dependencies: BTreeSet<PathBuf>,
    pub assets: BTreeMap<String, Asset>,
}

impl Compilation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BuildContext for Compilation {
    fn file_dependencies(&mut self) -> &mut dyn DependencySink {
        &mut self.file_dependencies
    }

    fn context_dependencies(&mut self) -> &mut dyn DependencySink {
        &mut self.context_dependencies
    }

    fn emit_asset(&mut self, name: String, asset: Asset) {
        self.assets.insert(name, asset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sink: &mut dyn DependencySink) {
        sink.append(PathBuf::from("/a"));
        sink.append(PathBuf::from("/a"));
        sink.append(PathBuf::from("/b"));
    }

    #[test]
    fn test_list_sink_keeps_duplicates() {
        let mut list: Vec<PathBuf> = Vec::new();
        record(&mut list);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_set_sinks_deduplicate() {
        let mut hash: HashSet<PathBuf> = HashSet::new();
        record(&mut hash);
        assert_eq!(hash.len(), 2);

        let mut tree: BTreeSet<PathBuf> = BTreeSet::new();
        record(&mut tree);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_asset_source_and_size() {
        let asset = Asset::new(vec![1u8, 2, 3, 4]);
        assert_eq!(asset.size(), 4);
        assert_eq!(asset.source(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_compilation_emit_replaces_by_name() {
        let mut compilation = Compilation::new();
        compilation.emit_asset("a.png".to_string(), Asset::new(vec![1u8]));
        compilation.emit_asset("a.png".to_string(), Asset::new(vec![1u8, 2]));
        assert_eq!(compilation.assets.len(), 1);
        assert_eq!(compilation.assets["a.png"].size(), 2);
    }
}
