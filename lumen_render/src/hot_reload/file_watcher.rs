/// Filesystem watcher mapping source paths to resource keys
///
/// Many keys can share one path (two programs sharing a vertex shader) and
/// one key can sit under several paths (vertex + fragment). An OS-level watch
/// exists for a path exactly while at least one key is registered under it
/// and a [`watch`](FileWatcher::watch) loop is running.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Wake, Waker};

use bitflags::bitflags;
use crossbeam::channel;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::hot_reload::CancellationToken;
use crate::{engine_debug, engine_err, engine_trace, engine_warn};

const SOURCE: &str = "lumen::FileWatcher";

// ============================================================================
// Change kinds
// ============================================================================

bitflags! {
    /// Filesystem change categories that trigger a reload
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangeKind: u8 {
        const WRITE = 1 << 0;
        const CREATE = 1 << 1;
        const RENAME = 1 << 2;
    }
}

impl ChangeKind {
    /// Classify a notification; metadata-only and removal events map to empty
    pub fn from_event_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::CREATE,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::RENAME,
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::empty(),
            EventKind::Modify(_) => ChangeKind::WRITE,
            _ => ChangeKind::empty(),
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Lexically clean a path: drop `.` components and fold `..` into their parent
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Turns a wake-up of the cancellation future into a channel message so the
/// blocking `select!` in the watch loop sees it
struct ChannelWaker(channel::Sender<()>);

impl Wake for ChannelWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        // Full means a wake-up is already pending
        let _ = self.0.try_send(());
    }
}

/// Path form used as watch key: absolute, with the parent directory resolved
///
/// Resolving only the parent keeps the mapping stable after the file itself
/// is deleted, and matches the paths notify reports through symlinked dirs.
fn watch_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let absolute = clean_path(&absolute);
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|dir| dir.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}

// ============================================================================
// FileWatcher
// ============================================================================

struct WatcherState<K> {
    targets: FxHashMap<PathBuf, Vec<K>>,
    os_watcher: Option<RecommendedWatcher>,
    watching: bool,
}

/// Path → keys registry driving reload callbacks
pub struct FileWatcher<K> {
    state: Mutex<WatcherState<K>>,
}

impl<K: Clone + PartialEq + std::fmt::Debug> FileWatcher<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WatcherState {
                targets: FxHashMap::default(),
                os_watcher: None,
                watching: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatcherState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `key` under `path`
    ///
    /// The first key for a path arms an OS-level watch when a loop is running.
    ///
    /// # Errors
    ///
    /// Returns `WatchFailed` if the OS refuses the watch; the key is not kept.
    pub fn add(&self, path: &Path, key: K) -> Result<()> {
        let path = watch_path(path);
        let mut state = self.lock();
        let first = !state.targets.contains_key(&path);
        if first {
            if let Some(os_watcher) = state.os_watcher.as_mut() {
                os_watcher
                    .watch(&path, RecursiveMode::NonRecursive)
                    .map_err(|err| engine_err!(SOURCE, WatchFailed, "watch {:?}: {}", path, err))?;
            }
        }
        engine_trace!(SOURCE, "Watching {:?} for {:?}", path, key);
        state.targets.entry(path).or_default().push(key);
        Ok(())
    }

    /// Unregister `key` from `path`
    ///
    /// The OS-level watch is dropped with the path's last key.
    ///
    /// # Errors
    ///
    /// Returns `WatchFailed` if `(path, key)` was never registered.
    pub fn remove(&self, path: &Path, key: &K) -> Result<()> {
        let path = watch_path(path);
        let mut state = self.lock();
        let Some(keys) = state.targets.get_mut(&path) else {
            return Err(engine_err!(SOURCE, WatchFailed, "{:?} is not watched", path));
        };
        let Some(index) = keys.iter().position(|k| k == key) else {
            return Err(engine_err!(SOURCE, WatchFailed, "{:?} is not watched for {:?}", path, key));
        };
        keys.remove(index);
        if keys.is_empty() {
            state.targets.remove(&path);
            if let Some(os_watcher) = state.os_watcher.as_mut() {
                // inotify drops the watch by itself when the file is deleted
                if let Err(err) = os_watcher.unwatch(&path) {
                    engine_debug!(SOURCE, "unwatch {:?}: {}", path, err);
                }
            }
        }
        Ok(())
    }

    /// Keys registered under `path`
    pub fn keys_for(&self, path: &Path) -> Vec<K> {
        self.lock().targets.get(&watch_path(path)).cloned().unwrap_or_default()
    }

    /// Number of watched paths
    pub fn path_count(&self) -> usize {
        self.lock().targets.len()
    }

    /// Whether a watch loop currently holds the OS watcher
    pub fn is_watching(&self) -> bool {
        self.lock().watching
    }

    /// Run the watch loop until `cancel` fires
    ///
    /// Blocks the calling thread. Write, create and rename events on a
    /// registered path invoke `on_changed` once per key under that path; the
    /// callback runs without the registry lock held, so it may add or
    /// remove keys.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRunning` if another loop is active on this watcher,
    /// or `WatchFailed` if the OS watcher cannot be created.
    pub fn watch<F>(&self, cancel: &CancellationToken, mut on_changed: F) -> Result<()>
    where
        F: FnMut(&K),
    {
        let (events_tx, events_rx) = channel::unbounded();
        {
            let mut state = self.lock();
            if state.watching {
                return Err(engine_err!(SOURCE, AlreadyRunning, "watch loop already running"));
            }
            let mut os_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                let _ = events_tx.send(res);
            })
            .map_err(Error::from)?;
            for path in state.targets.keys() {
                if let Err(err) = os_watcher.watch(path, RecursiveMode::NonRecursive) {
                    engine_warn!(SOURCE, "Cannot watch {:?}: {}", path, err);
                }
            }
            state.os_watcher = Some(os_watcher);
            state.watching = true;
        }
        engine_debug!(SOURCE, "Watch loop started");

        let (wake_tx, wake_rx) = channel::bounded(1);
        let waker = Waker::from(Arc::new(ChannelWaker(wake_tx)));
        let mut context = Context::from_waker(&waker);
        let mut cancelled = pin!(cancel.cancelled());

        loop {
            if cancelled.as_mut().poll(&mut context).is_ready() {
                break;
            }
            crossbeam::select! {
                recv(wake_rx) -> _ => {},
                recv(events_rx) -> message => match message {
                    Ok(Ok(event)) => self.dispatch(&event, &mut on_changed),
                    Ok(Err(err)) => engine_warn!(SOURCE, "Filesystem watcher failure: {}", err),
                    Err(_) => break,
                },
            }
        }

        {
            let mut state = self.lock();
            state.os_watcher = None;
            state.watching = false;
        }
        engine_debug!(SOURCE, "Watch loop stopped");
        Ok(())
    }

    fn dispatch<F>(&self, event: &Event, on_changed: &mut F)
    where
        F: FnMut(&K),
    {
        let kind = ChangeKind::from_event_kind(&event.kind);
        if kind.is_empty() {
            return;
        }
        for path in &event.paths {
            let path = watch_path(path);
            let keys = match self.lock().targets.get(&path) {
                Some(keys) => keys.clone(),
                None => {
                    engine_trace!(SOURCE, "Ignoring change on unwatched {:?}", path);
                    continue;
                }
            };
            if kind.intersects(ChangeKind::CREATE | ChangeKind::RENAME) {
                self.rearm(&path);
            }
            for key in &keys {
                on_changed(key);
            }
        }
    }

    /// Re-register a path whose inode was replaced (atomic saves)
    fn rearm(&self, path: &Path) {
        let mut state = self.lock();
        if let Some(os_watcher) = state.os_watcher.as_mut() {
            let _ = os_watcher.unwatch(path);
            if let Err(err) = os_watcher.watch(path, RecursiveMode::NonRecursive) {
                engine_debug!(SOURCE, "re-watch {:?}: {}", path, err);
            }
        }
    }
}

impl<K: Clone + PartialEq + std::fmt::Debug> Default for FileWatcher<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "file_watcher_tests.rs"]
mod tests;
