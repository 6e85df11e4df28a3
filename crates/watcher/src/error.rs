//! Internal error taxonomy for the watch pipeline
//!
//! These errors never cross the public boundary directly: the factory maps
//! them to `None`, `start()` maps them to `false`, and the event loop maps
//! them to a clean exit. They exist so the backends, the scanner, and the
//! controller can talk to each other precisely.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by backends and directory scans.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The native notification facility failed (creation, registration,
    /// or a mid-stream error reported by the OS).
    #[error("native watcher error: {0}")]
    Backend(#[from] notify::Error),

    /// Listing the watched directory failed.
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The watched directory itself no longer exists.
    #[error("watched directory {path} no longer exists")]
    RootGone { path: PathBuf },

    /// The internal event channel hung up.
    #[error("event channel disconnected")]
    Disconnected,
}
