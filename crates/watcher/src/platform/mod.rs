//! Platform backends for change detection
//!
//! A backend exposes one blocking operation: wait for the next change or
//! for cancellation. Two shapes exist:
//!
//! - the **native** backend (`notify`: inotify / FSEvents /
//!   ReadDirectoryChangesW) reports the exact entry and kind;
//! - the **poll** backend only reports that a rescan is due, and the event
//!   loop recovers per-entry events by diffing snapshots.
//!
//! Per-OS normalization of raw `notify` events lives in the cfg-gated
//! sibling modules; exactly one is selected per target.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::error::WatchError;
use crate::{BackendMode, WatchEvent};

pub(crate) mod native;
pub(crate) mod poll;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod fallback;

#[cfg(test)]
pub(crate) mod manual;

#[cfg(target_os = "linux")]
use linux as classify;

#[cfg(target_os = "macos")]
use macos as classify;

#[cfg(target_os = "windows")]
use windows as classify;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
use fallback as classify;

/// Outcome of one blocking wait on a backend.
#[derive(Debug)]
pub(crate) enum ChangeSignal {
    /// Precise changes: exact entries and kinds, in delivery order. One
    /// native notification may carry several (a rename arrives as a
    /// Deleted/Created pair).
    Changes(Vec<WatchEvent>),
    /// Something changed but the backend cannot say what; re-list the
    /// directory and diff against the previous snapshot.
    RescanNeeded,
    /// `stop()` was observed.
    Cancelled,
    /// The wait loop must terminate.
    Error(WatchError),
}

/// One OS-specific change-detection mechanism, owned by a single watch
/// thread.
pub(crate) trait WatchBackend: Send {
    /// Block until the next change, rescan request, cancellation, or error.
    fn wait(&mut self) -> ChangeSignal;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Backend strategy resolved once at construction time.
#[derive(Debug, Clone)]
pub(crate) enum BackendChoice {
    Native,
    Poll,
    #[cfg(test)]
    Manual(manual::ManualSource),
}

impl BackendChoice {
    pub(crate) fn resolve(mode: BackendMode) -> Self {
        match mode {
            BackendMode::Native => Self::Native,
            BackendMode::Poll => Self::Poll,
            BackendMode::Auto => {
                if cfg!(any(
                    target_os = "linux",
                    target_os = "macos",
                    target_os = "windows"
                )) {
                    Self::Native
                } else {
                    Self::Poll
                }
            }
        }
    }

    /// Acquire the native resource for this choice. Runs on the watch
    /// thread; failure here is what `start()` reports as `false`.
    pub(crate) fn acquire(
        &self,
        root: &Path,
        poll_interval: Duration,
        stop_rx: Receiver<()>,
    ) -> Result<Box<dyn WatchBackend>, WatchError> {
        match self {
            Self::Native => Ok(Box::new(native::NativeBackend::acquire(root, stop_rx)?)),
            Self::Poll => Ok(Box::new(poll::PollBackend::acquire(
                root,
                poll_interval,
                stop_rx,
            )?)),
            #[cfg(test)]
            Self::Manual(source) => Ok(Box::new(source.acquire(stop_rx)?)),
        }
    }
}

/// Whether `path` names an entry directly under `root`. Events deeper in
/// the tree (or for the root itself) are not this watcher's to report.
fn direct_child(root: &Path, path: &Path) -> bool {
    path.parent() == Some(root)
}

/// Keep only the direct children of `root` from a raw event's path list.
fn direct_children(root: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| direct_child(root, path))
        .collect()
}
