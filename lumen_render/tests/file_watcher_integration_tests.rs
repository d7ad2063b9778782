//! Integration tests for the filesystem watcher
//!
//! Real temp files and a real OS watcher.
//!
//! Run with: cargo test --test file_watcher_integration_tests

use crossbeam::channel::{self, Receiver};
use lumen_render::lumen::hot_reload::{CancellationToken, FileWatcher};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

struct RunningWatcher {
    watcher: Arc<FileWatcher<String>>,
    cancel: CancellationToken,
    changes: Receiver<String>,
    handle: JoinHandle<lumen_render::lumen::Result<()>>,
}

impl RunningWatcher {
    fn start(watcher: FileWatcher<String>) -> Self {
        Self::start_shared(Arc::new(watcher))
    }

    fn start_shared(watcher: Arc<FileWatcher<String>>) -> Self {
        let cancel = CancellationToken::new();
        let (changes_tx, changes) = channel::unbounded();
        let handle = {
            let watcher = watcher.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                watcher.watch(&cancel, |key: &String| {
                    let _ = changes_tx.send(key.clone());
                })
            })
        };
        let deadline = Instant::now() + TIMEOUT;
        while !watcher.is_watching() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(watcher.is_watching());
        Self { watcher, cancel, changes, handle }
    }

    /// Wait for a notification for `key`, skipping others
    fn expect_change(&self, key: &str) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(seen) = self.changes.recv_timeout(Duration::from_millis(100)) {
                if seen == key {
                    return true;
                }
            }
        }
        false
    }

    /// Drain pending notifications once the filesystem settles
    fn settle(&self) {
        std::thread::sleep(Duration::from_millis(300));
        while self.changes.try_recv().is_ok() {}
    }

    fn stop(self) {
        self.cancel.cancel();
        assert!(self.handle.join().unwrap().is_ok());
        assert!(!self.watcher.is_watching());
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_integration_vertex_and_fragment_map_to_one_key() {
    let dir = tempfile::tempdir().unwrap();
    let vertex = dir.path().join("sprite.vert");
    let fragment = dir.path().join("sprite.frag");
    std::fs::write(&vertex, "v1").unwrap();
    std::fs::write(&fragment, "f1").unwrap();

    let watcher = FileWatcher::new();
    watcher.add(&vertex, "sprite".to_string()).unwrap();
    watcher.add(&fragment, "sprite".to_string()).unwrap();
    let running = RunningWatcher::start(watcher);

    std::fs::write(&fragment, "f2").unwrap();
    assert!(running.expect_change("sprite"));
    running.settle();

    std::fs::write(&vertex, "v2").unwrap();
    assert!(running.expect_change("sprite"));

    running.stop();
}

#[test]
fn test_integration_watch_loop_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grass.png");
    std::fs::write(&path, "one").unwrap();

    let watcher = FileWatcher::new();
    watcher.add(&path, "tex:grass".to_string()).unwrap();
    let first = RunningWatcher::start(watcher);
    let watcher = first.watcher.clone();
    first.stop();

    let second = RunningWatcher::start_shared(watcher);
    std::fs::write(&path, "two").unwrap();
    assert!(second.expect_change("tex:grass"));

    second.stop();
}

#[test]
fn test_integration_removed_key_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("common.vert");
    std::fs::write(&shared, "v1").unwrap();

    let watcher = FileWatcher::new();
    watcher.add(&shared, "sprite".to_string()).unwrap();
    watcher.add(&shared, "outline".to_string()).unwrap();
    let running = RunningWatcher::start(watcher);

    running.watcher.remove(&shared, &"outline".to_string()).unwrap();
    assert_eq!(running.watcher.keys_for(&shared), vec!["sprite".to_string()]);

    std::fs::write(&shared, "v2").unwrap();
    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if let Ok(key) = running.changes.recv_timeout(Duration::from_millis(100)) {
            seen.push(key);
        }
    }
    assert!(seen.contains(&"sprite".to_string()));
    assert!(!seen.contains(&"outline".to_string()));

    running.stop();
}
