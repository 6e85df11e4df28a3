//! Cross-platform directory change notification
//!
//! Watches a single directory (non-recursively) and reports creation,
//! deletion, and modification of the entries under it through a callback:
//!
//! ```no_run
//! use watcher::DirWatcher;
//!
//! let watcher = DirWatcher::watch("/tmp/inbox", |kind, path| {
//!     println!("{kind}: {}", path.display());
//! })
//! .expect("not a directory");
//!
//! assert!(watcher.start());
//! // ... callback fires on the watch thread as entries change ...
//! watcher.stop();
//! ```
//!
//! Two backend shapes are reconciled behind one API: precise native
//! notifications (`notify`) where the OS reports exact per-entry deltas,
//! and coarse interval polling where each tick triggers a rescan-and-diff
//! against the previous [`snapshot::DirSnapshot`].
//!
//! Contract notes:
//! - The callback runs synchronously on the watch thread; a callback that
//!   blocks stalls all further delivery for that watcher.
//! - Calling `stop()` from inside the callback deadlocks (it joins the
//!   thread the callback is running on). Don't.
//! - Delivery is at-least-once: bursts of rapid modifications to one entry
//!   are not coalesced.
//! - Watchers are independent; there is no shared state across instances.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub mod error;
pub mod snapshot;

mod platform;

pub use error::WatchError;

use platform::{BackendChoice, ChangeSignal, WatchBackend};
use snapshot::DirSnapshot;

/// What happened to a directory entry.
///
/// A rename is reported as `Deleted` for the old name followed by
/// `Created` for the new name; there is no separate rename kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Created => "created",
            ChangeKind::Changed => "changed",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One change to one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Which change-detection backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Native notifications where the target OS has them, polling
    /// otherwise.
    #[default]
    Auto,
    /// Force native notifications; acquisition fails where unsupported.
    Native,
    /// Force interval polling. Useful on network and overlay filesystems
    /// that drop native notifications.
    Poll,
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Backend selection strategy, resolved once at construction.
    #[serde(default)]
    pub backend: BackendMode,

    /// Rescan interval for the polling backend, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Auto,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WatchConfig {
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

type Callback = Arc<dyn Fn(ChangeKind, &Path) + Send + Sync + 'static>;

/// The running half of a watch: stop channel plus thread handle.
struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// A directory watcher.
///
/// Created idle; [`start`](Self::start) spawns one dedicated watch thread,
/// [`stop`](Self::stop) cancels and joins it. Dropping a running watcher
/// stops it.
pub struct DirWatcher {
    path: PathBuf,
    config: WatchConfig,
    choice: BackendChoice,
    callback: Callback,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl DirWatcher {
    /// Watch `path` with the default configuration.
    ///
    /// Returns `None` if `path` does not currently exist or is not a
    /// directory. Read permission is not checked here; a permission
    /// problem surfaces later as `start()` returning `false`.
    pub fn watch(
        path: impl AsRef<Path>,
        callback: impl Fn(ChangeKind, &Path) + Send + Sync + 'static,
    ) -> Option<Self> {
        Self::with_config(path, WatchConfig::default(), callback)
    }

    /// Watch `path` with an explicit configuration.
    pub fn with_config(
        path: impl AsRef<Path>,
        config: WatchConfig,
        callback: impl Fn(ChangeKind, &Path) + Send + Sync + 'static,
    ) -> Option<Self> {
        let choice = BackendChoice::resolve(config.backend);
        Self::build(path.as_ref(), config, choice, Arc::new(callback))
    }

    #[cfg(test)]
    fn with_manual(
        path: impl AsRef<Path>,
        source: platform::manual::ManualSource,
        callback: impl Fn(ChangeKind, &Path) + Send + Sync + 'static,
    ) -> Option<Self> {
        Self::build(
            path.as_ref(),
            WatchConfig::default(),
            BackendChoice::Manual(source),
            Arc::new(callback),
        )
    }

    fn build(
        path: &Path,
        config: WatchConfig,
        choice: BackendChoice,
        callback: Callback,
    ) -> Option<Self> {
        if !path.is_dir() {
            debug!(path = %path.display(), "watch target is not a directory");
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            config,
            choice,
            callback,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// The watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the watch thread is currently delivering events.
    ///
    /// Turns false on `stop()`, and also when the thread exits on its own
    /// after a runtime error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start watching. Idle -> Running.
    ///
    /// Spawns the watch thread and blocks until it has either acquired the
    /// backend and captured the initial snapshot, or failed. Returns `true`
    /// only on success; on failure no thread or native handle is left
    /// behind and a later `start()` may succeed.
    ///
    /// Calling `start()` while already running is a no-op returning
    /// `false`.
    pub fn start(&self) -> bool {
        let mut slot = self.worker.lock();

        if slot.is_some() {
            if self.running.load(Ordering::SeqCst) {
                return false;
            }
            // The thread exited (or is exiting) on a runtime error; reap
            // it so the watch is restartable.
            if let Some(worker) = slot.take() {
                let _ = worker.handle.join();
            }
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        // Single-slot handshake: start() does not return until the thread
        // has attempted acquisition.
        let (ready_tx, ready_rx) = bounded::<Result<(), WatchError>>(1);

        let path = self.path.clone();
        let choice = self.choice.clone();
        let poll_interval = self.config.poll_interval();
        let running = Arc::clone(&self.running);
        let callback = Arc::clone(&self.callback);

        let thread_name = format!(
            "watch:{}",
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "root".to_owned())
        );
        let spawned = thread::Builder::new().name(thread_name).spawn(move || {
            let backend = match choice.acquire(&path, poll_interval, stop_rx) {
                Ok(backend) => backend,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            let snapshot = match DirSnapshot::capture(&path) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            info!(path = %path.display(), backend = backend.name(), "watch established");
            running.store(true, Ordering::SeqCst);
            let _ = ready_tx.send(Ok(()));

            run_loop(&path, backend, snapshot, &running, &callback);
        });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to spawn watch thread");
                return false;
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *slot = Some(Worker { stop_tx, handle });
                true
            }
            other => {
                if let Ok(Err(err)) = other {
                    warn!(path = %self.path.display(), error = %err, "failed to start watch");
                }
                let _ = handle.join();
                false
            }
        }
    }

    /// Stop watching. Running -> Idle.
    ///
    /// Idempotent and safe from any thread except the watch thread itself.
    /// The first call wakes the pending backend wait and joins the thread;
    /// later and concurrent calls observe the empty slot and return.
    pub fn stop(&self) {
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return;
        };

        self.running.store(false, Ordering::SeqCst);
        let _ = worker.stop_tx.try_send(());
        if worker.handle.join().is_err() {
            warn!(path = %self.path.display(), "watch thread panicked");
        } else {
            info!(path = %self.path.display(), "watch stopped");
        }
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for DirWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirWatcher")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// The watch thread's event loop. Exits on cancellation or error; on error
/// it clears the running flag itself so the watcher reads as idle.
fn run_loop(
    path: &Path,
    mut backend: Box<dyn WatchBackend>,
    mut snapshot: DirSnapshot,
    running: &AtomicBool,
    callback: &Callback,
) {
    loop {
        match backend.wait() {
            ChangeSignal::Changes(events) => {
                for event in events {
                    snapshot.record(event.kind, &event.path);
                    if !deliver(running, callback, &event) {
                        return;
                    }
                }
            }
            ChangeSignal::RescanNeeded => {
                let fresh = match DirSnapshot::capture(path) {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "rescan failed, watch loop exiting");
                        break;
                    }
                };
                let events = snapshot.diff(&fresh);
                snapshot = fresh;
                for event in events {
                    if !deliver(running, callback, &event) {
                        return;
                    }
                }
            }
            ChangeSignal::Cancelled => {
                debug!(path = %path.display(), "watch loop cancelled");
                return;
            }
            ChangeSignal::Error(err) => {
                warn!(path = %path.display(), error = %err, "watch loop exiting on error");
                break;
            }
        }
    }
    running.store(false, Ordering::SeqCst);
}

/// Invoke the callback unless a stop has been requested in the meantime.
/// Returns false once delivery must cease.
fn deliver(running: &AtomicBool, callback: &Callback, event: &WatchEvent) -> bool {
    if !running.load(Ordering::SeqCst) {
        return false;
    }
    debug!(kind = %event.kind, path = %event.path.display(), "delivering change");
    (**callback)(event.kind, &event.path);
    true
}
