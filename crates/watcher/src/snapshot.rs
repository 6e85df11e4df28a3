//! Point-in-time directory snapshots and snapshot diffing
//!
//! A [`DirSnapshot`] maps every entry directly under a directory to its
//! metadata. Coarse backends cannot name what changed, so the event loop
//! re-captures a snapshot on every wake and diffs it against the previous
//! one to recover per-entry events.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::WatchError;
use crate::{ChangeKind, WatchEvent};

/// Metadata recorded for one directory entry.
///
/// Equality is strictly field-wise (`#[derive(PartialEq)]`), at the finest
/// resolution the OS exposes. On unix that includes the raw stat fields, so
/// a touch that only bumps the nanosecond mtime still compares unequal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    is_dir: bool,
    is_symlink: bool,
    len: u64,
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(unix)]
    mode: u32,
    #[cfg(unix)]
    nlink: u64,
    #[cfg(unix)]
    uid: u32,
    #[cfg(unix)]
    gid: u32,
    #[cfg(unix)]
    mtime: i64,
    #[cfg(unix)]
    mtime_nsec: i64,
    #[cfg(windows)]
    attributes: u32,
    #[cfg(windows)]
    last_write: u64,
    #[cfg(not(any(unix, windows)))]
    modified: Option<std::time::SystemTime>,
}

impl EntryMeta {
    /// Build an `EntryMeta` from an already-fetched stat result.
    pub(crate) fn from_metadata(md: &fs::Metadata) -> Self {
        #[cfg(unix)]
        use std::os::unix::fs::MetadataExt;
        #[cfg(windows)]
        use std::os::windows::fs::MetadataExt;

        Self {
            is_dir: md.is_dir(),
            is_symlink: md.file_type().is_symlink(),
            len: md.len(),
            #[cfg(unix)]
            dev: md.dev(),
            #[cfg(unix)]
            ino: md.ino(),
            #[cfg(unix)]
            mode: md.mode(),
            #[cfg(unix)]
            nlink: md.nlink(),
            #[cfg(unix)]
            uid: md.uid(),
            #[cfg(unix)]
            gid: md.gid(),
            #[cfg(unix)]
            mtime: md.mtime(),
            #[cfg(unix)]
            mtime_nsec: md.mtime_nsec(),
            #[cfg(windows)]
            attributes: md.file_attributes(),
            #[cfg(windows)]
            last_write: md.last_write_time(),
            #[cfg(not(any(unix, windows)))]
            modified: md.modified().ok(),
        }
    }
}

/// A point-in-time map of directory entries to metadata.
///
/// Built by one full non-recursive listing, immutable once built, replaced
/// wholesale on each rescan. Owned and mutated only by the watch thread.
#[derive(Debug, Clone, Default)]
pub struct DirSnapshot {
    entries: AHashMap<PathBuf, EntryMeta>,
}

impl DirSnapshot {
    /// Capture a snapshot of the entries directly under `root`.
    ///
    /// Entries that vanish between listing and stat are skipped; a failure
    /// to list `root` itself is an error.
    pub fn capture(root: &Path) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::RootGone {
                path: root.to_path_buf(),
            });
        }

        let mut entries = AHashMap::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.path() == Some(root) {
                        return Err(WatchError::Scan {
                            path: root.to_path_buf(),
                            source: err.into(),
                        });
                    }
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            match entry.metadata() {
                Ok(md) => {
                    entries.insert(entry.into_path(), EntryMeta::from_metadata(&md));
                }
                Err(err) => {
                    // Entry vanished between listing and stat; the next
                    // rescan settles it.
                    debug!(path = %entry.path().display(), error = %err, "entry vanished during scan");
                }
            }
        }

        Ok(Self { entries })
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compute the events that turn `self` into `new`.
    ///
    /// Deleted and Changed entries (derived from the old side) come first,
    /// then Created entries (derived from the new side); each group is
    /// sorted by path so identical inputs give identical output.
    pub fn diff(&self, new: &DirSnapshot) -> Vec<WatchEvent> {
        let mut out = Vec::new();

        for (path, meta) in &self.entries {
            match new.entries.get(path) {
                None => out.push(WatchEvent {
                    kind: ChangeKind::Deleted,
                    path: path.clone(),
                }),
                Some(fresh) if fresh != meta => out.push(WatchEvent {
                    kind: ChangeKind::Changed,
                    path: path.clone(),
                }),
                Some(_) => {}
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));

        let mut created: Vec<WatchEvent> = new
            .entries
            .keys()
            .filter(|path| !self.entries.contains_key(*path))
            .map(|path| WatchEvent {
                kind: ChangeKind::Created,
                path: path.clone(),
            })
            .collect();
        created.sort_by(|a, b| a.path.cmp(&b.path));

        out.extend(created);
        out
    }

    /// Fold a precise event into the snapshot so a later overflow rescan
    /// diffs against current state rather than the start-up listing.
    pub(crate) fn record(&mut self, kind: ChangeKind, path: &Path) {
        match kind {
            ChangeKind::Deleted => {
                self.entries.remove(path);
            }
            ChangeKind::Created | ChangeKind::Changed => match fs::symlink_metadata(path) {
                Ok(md) => {
                    self.entries
                        .insert(path.to_path_buf(), EntryMeta::from_metadata(&md));
                }
                // Already gone again; drop it rather than keep stale state.
                Err(_) => {
                    self.entries.remove(path);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn self_diff_is_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let snap = DirSnapshot::capture(tmp.path()).unwrap();
        assert_eq!(snap.len(), 2);
        assert!(snap.diff(&snap).is_empty());
    }

    #[test]
    fn capture_fails_for_missing_root() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone");
        assert!(matches!(
            DirSnapshot::capture(&missing),
            Err(WatchError::RootGone { .. })
        ));
    }

    #[test]
    fn single_create_yields_one_created() {
        let tmp = TempDir::new().unwrap();
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        let file = tmp.path().join("x.txt");
        fs::write(&file, b"x").unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        let events = old.diff(&new);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Created);
        assert_eq!(events[0].path, file);
    }

    #[test]
    fn single_delete_yields_one_deleted() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.txt");
        fs::write(&file, b"x").unwrap();
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        fs::remove_file(&file).unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        let events = old.diff(&new);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Deleted);
        assert_eq!(events[0].path, file);
    }

    #[test]
    fn mtime_only_change_yields_changed() {
        use filetime::{set_file_mtime, FileTime};

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.txt");
        fs::write(&file, b"same length").unwrap();
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        let backdated = SystemTime::now() - Duration::from_secs(600);
        set_file_mtime(&file, FileTime::from_system_time(backdated)).unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        let events = old.diff(&new);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Changed);
        assert_eq!(events[0].path, file);
    }

    #[test]
    fn rename_yields_deleted_then_created() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("a.txt");
        let to = tmp.path().join("b.txt");
        fs::write(&from, b"contents").unwrap();
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        fs::rename(&from, &to).unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        let events = old.diff(&new);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::Deleted);
        assert_eq!(events[0].path, from);
        assert_eq!(events[1].kind, ChangeKind::Created);
        assert_eq!(events[1].path, to);
    }

    #[test]
    fn old_side_precedes_created_and_is_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), b"b").unwrap();
        fs::write(tmp.path().join("d.txt"), b"d").unwrap();
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        fs::remove_file(tmp.path().join("d.txt")).unwrap();
        fs::write(tmp.path().join("b.txt"), b"bb").unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        fs::write(tmp.path().join("c.txt"), b"c").unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        let events = old.diff(&new);
        let kinds: Vec<ChangeKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Changed,
                ChangeKind::Deleted,
                ChangeKind::Created,
                ChangeKind::Created,
            ]
        );
        assert_eq!(events[0].path, tmp.path().join("b.txt"));
        assert_eq!(events[1].path, tmp.path().join("d.txt"));
        assert_eq!(events[2].path, tmp.path().join("a.txt"));
        assert_eq!(events[3].path, tmp.path().join("c.txt"));
    }

    #[test]
    fn entry_meta_equality_is_stable_across_stats() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.txt");
        fs::write(&file, b"x").unwrap();

        let a = EntryMeta::from_metadata(&fs::symlink_metadata(&file).unwrap());
        let b = EntryMeta::from_metadata(&fs::symlink_metadata(&file).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn record_tracks_precise_events() {
        let tmp = TempDir::new().unwrap();
        let mut snap = DirSnapshot::capture(tmp.path()).unwrap();

        let file = tmp.path().join("x.txt");
        fs::write(&file, b"x").unwrap();
        snap.record(ChangeKind::Created, &file);
        assert_eq!(snap.len(), 1);

        // In sync with a fresh capture, so an overflow rescan diffs clean.
        let fresh = DirSnapshot::capture(tmp.path()).unwrap();
        assert!(snap.diff(&fresh).is_empty());

        fs::remove_file(&file).unwrap();
        snap.record(ChangeKind::Deleted, &file);
        assert!(snap.is_empty());
    }
}
