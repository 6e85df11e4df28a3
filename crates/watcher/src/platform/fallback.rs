//! Event classification for other unixes (kqueue and friends)
//!
//! kqueue watches at inode granularity and notify's emulation layer fills
//! in per-name events where it can. Rename sides are not cookie-paired, so
//! name changes are resolved the same way as on macOS: stat the path and
//! let presence decide which side of the rename it is.

use std::path::Path;

use notify::event::ModifyKind;
use notify::EventKind;

use super::direct_children;
use crate::{ChangeKind, WatchEvent};

pub(super) fn classify(event: notify::Event, root: &Path) -> Vec<WatchEvent> {
    let kind = event.kind;
    let paths = direct_children(root, event.paths);

    let map = |kind: ChangeKind, paths: Vec<std::path::PathBuf>| {
        paths
            .into_iter()
            .map(|path| WatchEvent { kind, path })
            .collect()
    };

    match kind {
        EventKind::Create(_) => map(ChangeKind::Created, paths),
        EventKind::Remove(_) => map(ChangeKind::Deleted, paths),
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
        EventKind::Modify(_) => map(ChangeKind::Changed, paths),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
