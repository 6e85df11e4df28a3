//! Linux (inotify) event classification
//!
//! inotify delivers clean per-name deltas for a non-recursive watch:
//! `IN_CREATE`/`IN_MOVED_TO` for appearances, `IN_DELETE`/`IN_MOVED_FROM`
//! for disappearances, `IN_MODIFY`/`IN_ATTRIB`/`IN_CLOSE_WRITE` for content
//! and metadata changes. notify surfaces moves as `Name(From)`/`Name(To)`
//! (or `Name(Both)` when it pairs them by cookie); a rename is reported
//! here as Deleted(old) then Created(new).

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
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
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => map(ChangeKind::Deleted, paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => map(ChangeKind::Created, paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // Cookie-paired move: [old, new].
            let mut out = Vec::with_capacity(paths.len());
            let mut iter = paths.into_iter();
            if let Some(from) = iter.next() {
                out.push(WatchEvent {
                    kind: ChangeKind::Deleted,
                    path: from,
                });
            }
            for to in iter {
                out.push(WatchEvent {
                    kind: ChangeKind::Created,
                    path: to,
                });
            }
            out
        }
        EventKind::Modify(_) => map(ChangeKind::Changed, paths),
        // Access/open/close and catch-all kinds carry no content delta.
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
