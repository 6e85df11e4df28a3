//! Deterministic test backend
//!
//! Lets controller tests script the exact sequence of signals a backend
//! produces, including acquisition refusal, without touching the OS.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{select, Receiver, Sender};

use super::{ChangeSignal, WatchBackend};
use crate::error::WatchError;

/// Test-side handle: inject signals and toggle acquisition failure.
pub(crate) struct ManualHandle {
    script_tx: Sender<ChangeSignal>,
    fail_acquire: Arc<AtomicBool>,
}

impl ManualHandle {
    pub(crate) fn push(&self, signal: ChangeSignal) {
        self.script_tx
            .send(signal)
            .expect("manual backend receiver dropped");
    }

    pub(crate) fn set_fail_acquire(&self, fail: bool) {
        self.fail_acquire.store(fail, Ordering::SeqCst);
    }
}

/// Watcher-side source; cloned into each start attempt.
#[derive(Debug, Clone)]
pub(crate) struct ManualSource {
    script_rx: Receiver<ChangeSignal>,
    fail_acquire: Arc<AtomicBool>,
}

impl ManualSource {
    pub(crate) fn acquire(&self, stop_rx: Receiver<()>) -> Result<ManualBackend, WatchError> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(notify::Error::generic("acquisition refused by test").into());
        }
        Ok(ManualBackend {
            script_rx: self.script_rx.clone(),
            stop_rx,
        })
    }
}

pub(crate) fn manual_pair() -> (ManualHandle, ManualSource) {
    let (script_tx, script_rx) = crossbeam_channel::unbounded();
    let fail_acquire = Arc::new(AtomicBool::new(false));
    (
        ManualHandle {
            script_tx,
            fail_acquire: Arc::clone(&fail_acquire),
        },
        ManualSource {
            script_rx,
            fail_acquire,
        },
    )
}

pub(crate) struct ManualBackend {
    script_rx: Receiver<ChangeSignal>,
    stop_rx: Receiver<()>,
}

impl WatchBackend for ManualBackend {
    fn wait(&mut self) -> ChangeSignal {
        select! {
            recv(self.stop_rx) -> _ => ChangeSignal::Cancelled,
            recv(self.script_rx) -> msg => match msg {
                Ok(signal) => signal,
                Err(_) => ChangeSignal::Error(WatchError::Disconnected),
            },
        }
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
