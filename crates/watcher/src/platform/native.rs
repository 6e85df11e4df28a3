//! Precise backend over the OS notification facility
//!
//! Wraps `notify`'s recommended watcher (inotify on Linux, FSEvents on
//! macOS, ReadDirectoryChangesW on Windows) in non-recursive mode. Raw
//! events are pushed into an unbounded channel by notify's callback thread;
//! `wait` multiplexes that channel with the stop channel so a pending wait
//! returns promptly once `stop()` begins.

use std::path::{Path, PathBuf};

use crossbeam_channel::{select, Receiver};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use super::{classify, ChangeSignal, WatchBackend};
use crate::error::WatchError;

pub(crate) struct NativeBackend {
    root: PathBuf,
    watcher: RecommendedWatcher,
    events_rx: Receiver<notify::Result<notify::Event>>,
    stop_rx: Receiver<()>,
}

impl NativeBackend {
    pub(crate) fn acquire(root: &Path, stop_rx: Receiver<()>) -> Result<Self, WatchError> {
        // FSEvents reports canonical paths; match the registration to what
        // the OS will hand back so the direct-child filter holds.
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let (raw_tx, events_rx) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            root,
            watcher,
            events_rx,
            stop_rx,
        })
    }
}

impl WatchBackend for NativeBackend {
    fn wait(&mut self) -> ChangeSignal {
        loop {
            select! {
                recv(self.stop_rx) -> _ => return ChangeSignal::Cancelled,
                recv(self.events_rx) -> msg => {
                    let res = match msg {
                        Ok(res) => res,
                        Err(_) => return ChangeSignal::Error(WatchError::Disconnected),
                    };
                    let event = match res {
                        Ok(event) => event,
                        Err(err) => return ChangeSignal::Error(err.into()),
                    };

                    // Queue overflow: the OS dropped events. Fall back to
                    // rescan-and-diff to recover.
                    if event.need_rescan() {
                        return ChangeSignal::RescanNeeded;
                    }

                    if event.kind.is_remove() && event.paths.iter().any(|p| p == &self.root) {
                        return ChangeSignal::Error(WatchError::RootGone {
                            path: self.root.clone(),
                        });
                    }

                    let changes = classify::classify(event, &self.root);
                    if !changes.is_empty() {
                        return ChangeSignal::Changes(changes);
                    }
                    // Noise (access, out-of-scope paths); keep waiting.
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "notify"
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        if let Err(err) = self.watcher.unwatch(&self.root) {
            debug!(path = %self.root.display(), error = %err, "unwatch on shutdown failed");
        }
    }
}
