//! macOS (FSEvents) event classification
//!
//! FSEvents coalesces flags per path and does not order them: a short-lived
//! file can arrive as one event carrying both create and remove flags, and
//! a rename is a bare `Name(Any)` with no indication of which side this
//! path is. The only reliable disambiguation is to stat the path: present
//! means this is the new name (or a survived create), absent means the old
//! name (or a completed delete).

use std::path::Path;

use notify::event::ModifyKind;
use notify::EventKind;

use super::direct_children;
use crate::{ChangeKind, WatchEvent};

pub(super) fn classify(event: notify::Event, root: &Path) -> Vec<WatchEvent> {
    let kind = event.kind;
    let paths = direct_children(root, event.paths);

    match kind {
        EventKind::Create(_) => paths
            .into_iter()
            .map(|path| WatchEvent {
                kind: if path.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                },
                path,
            })
            .collect(),
        EventKind::Remove(_) => paths
            .into_iter()
            .map(|path| WatchEvent {
                kind: ChangeKind::Deleted,
                path,
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .into_iter()
            .map(|path| WatchEvent {
                kind: if path.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                },
                path,
            })
            .collect(),
        EventKind::Modify(_) => paths
            .into_iter()
            .map(|path| WatchEvent {
                kind: ChangeKind::Changed,
                path,
            })
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
