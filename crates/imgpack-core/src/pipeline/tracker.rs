//! Dependency tracking and change detection.
//!
//! Every file or directory the pipeline reads is registered with the host as
//! a dependency and added to a single filesystem watcher. Any change on a
//! watched path raises the dirty flag, which gates the next run.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::error::{PipelineError, PipelineResult};
use crate::host::DependencySink;

/// Snapshot of the tracker's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchState {
    /// A watcher has been created
    pub armed: bool,
    /// A change was observed since the last run began
    pub dirty: bool,
    /// At least one run has completed
    pub started: bool,
}

/// Records dependencies and owns the single watcher for the pipeline's lifetime.
///
/// The watcher callback is the only writer of `dirty = true`; the pipeline is
/// the only writer of `dirty = false` and `started = true`.
pub struct DependencyTracker {
    dirty: Arc<AtomicBool>,
    started: AtomicBool,
    changes: Arc<Notify>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    /// Paths handed to the watcher, with the mode they were watched in
    watched: Mutex<HashMap<PathBuf, RecursiveMode>>,
}

impl Default for DependencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyTracker {
    /// Create a tracker. The dirty flag starts raised so the first run always
    /// does work.
    pub fn new() -> Self {
        Self {
            dirty: Arc::new(AtomicBool::new(true)),
            started: AtomicBool::new(false),
            changes: Arc::new(Notify::new()),
            watcher: Mutex::new(None),
            watched: Mutex::new(HashMap::new()),
        }
    }

    /// Register `path` with the host and watch it for changes.
    ///
    /// A path that cannot be watched is still registered; the failure is
    /// logged and the host's own rebuild tracking takes over.
    pub fn add_dependency(&self, sink: &mut dyn DependencySink, path: &Path) {
        sink.append(path.to_path_buf());
        if let Err(e) = self.arm_watch(path) {
            tracing::warn!("{e}");
        }
    }

    /// Extend the watcher's scope to `path`, creating the watcher on first use.
    ///
    /// Only changes after this call count. Directories are watched
    /// recursively. A path that does not exist yet is covered by watching
    /// its nearest existing ancestor, so its creation is observed.
    pub fn arm_watch(&self, path: &Path) -> PipelineResult<()> {
        let mut watched = lock(&self.watched);
        if is_covered(&watched, path) {
            return Ok(());
        }

        let (target, mode) = if path.exists() {
            let mode = if path.is_dir() {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            (path.to_path_buf(), mode)
        } else {
            match nearest_existing_ancestor(path) {
                Some(ancestor) => (ancestor, RecursiveMode::NonRecursive),
                None => {
                    return Err(PipelineError::Watch {
                        path: path.to_path_buf(),
                        message: "no existing ancestor to watch".to_string(),
                    })
                }
            }
        };
        if is_covered(&watched, &target) {
            return Ok(());
        }

        let mut guard = lock(&self.watcher);
        let watcher = match guard.take() {
            Some(watcher) => watcher,
            None => self.create_watcher(path)?,
        };
        let watcher = guard.insert(watcher);
        watcher
            .watch(&target, mode)
            .map_err(|e| PipelineError::Watch {
                path: target.clone(),
                message: e.to_string(),
            })?;

        tracing::trace!("Watching {:?} ({:?})", target, mode);
        watched.insert(target, mode);
        Ok(())
    }

    fn create_watcher(&self, path: &Path) -> PipelineResult<RecommendedWatcher> {
        let dirty = Arc::clone(&self.dirty);
        let changes = Arc::clone(&self.changes);
        notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Reads (including our own decode stage) are not changes.
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                tracing::debug!("Change detected: {:?} {:?}", event.kind, event.paths);
                dirty.store(true, Ordering::SeqCst);
                changes.notify_one();
            }
            Err(e) => tracing::warn!("Watch error: {e}"),
        })
        .map_err(|e| PipelineError::Watch {
            path: path.to_path_buf(),
            message: format!("failed to create watcher: {e}"),
        })
    }

    /// Raise the dirty flag by hand, as if a watched path had changed.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        self.changes.notify_one();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether a run can be skipped: one has completed and nothing changed since.
    pub fn can_skip(&self) -> bool {
        self.has_started() && !self.is_dirty()
    }

    /// Clear the dirty flag as a run begins.
    ///
    /// Changes observed while the run is in flight raise it again and force
    /// the next run.
    pub(crate) fn begin_run(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    pub(crate) fn finish_run(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    /// Wait until the next observed change.
    pub async fn changed(&self) {
        self.changes.notified().await;
    }

    pub fn state(&self) -> WatchState {
        WatchState {
            armed: lock(&self.watcher).is_some(),
            dirty: self.is_dirty(),
            started: self.has_started(),
        }
    }

    /// Number of distinct paths handed to the watcher.
    pub fn watched_count(&self) -> usize {
        lock(&self.watched).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_covered(watched: &HashMap<PathBuf, RecursiveMode>, path: &Path) -> bool {
    watched.iter().any(|(root, mode)| {
        root == path || (*mode == RecursiveMode::Recursive && path.starts_with(root))
    })
}

fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .map(Path::to_path_buf)
}
