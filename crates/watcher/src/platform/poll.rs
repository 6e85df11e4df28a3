//! Coarse backend: interval-driven rescans
//!
//! No native facility at all. The blocking wait is a timed receive on the
//! stop channel, so the cancel source and the tick share one suspension
//! point. Every tick answers RescanNeeded; whether anything actually
//! changed is decided by the diff (an empty diff delivers nothing).
//!
//! This is also the forced fallback for filesystems where native
//! notifications silently go missing (NFS, overlay mounts, some WSL
//! setups).

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::{ChangeSignal, WatchBackend};
use crate::error::WatchError;

pub(crate) struct PollBackend {
    root: PathBuf,
    interval: Duration,
    stop_rx: Receiver<()>,
}

impl PollBackend {
    pub(crate) fn acquire(
        root: &Path,
        interval: Duration,
        stop_rx: Receiver<()>,
    ) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::RootGone {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            interval,
            stop_rx,
        })
    }
}

impl WatchBackend for PollBackend {
    fn wait(&mut self) -> ChangeSignal {
        match self.stop_rx.recv_timeout(self.interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => ChangeSignal::Cancelled,
            Err(RecvTimeoutError::Timeout) => {
                if self.root.is_dir() {
                    ChangeSignal::RescanNeeded
                } else {
                    ChangeSignal::Error(WatchError::RootGone {
                        path: self.root.clone(),
                    })
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}
