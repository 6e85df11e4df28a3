//! Snapshot capture and diff benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use tempfile::TempDir;
use watcher::snapshot::DirSnapshot;

fn populated_dir(entries: usize) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for i in 0..entries {
        fs::write(tmp.path().join(format!("file{i:05}.txt")), b"payload").unwrap();
    }
    tmp
}

fn bench_capture(c: &mut Criterion) {
    for entries in [100usize, 1_000, 10_000] {
        let tmp = populated_dir(entries);
        c.bench_function(&format!("snapshot_capture_{entries}"), |b| {
            b.iter(|| black_box(DirSnapshot::capture(tmp.path()).unwrap()));
        });
    }
}

fn bench_diff(c: &mut Criterion) {
    for entries in [100usize, 1_000, 10_000] {
        let tmp = populated_dir(entries);
        let old = DirSnapshot::capture(tmp.path()).unwrap();

        // A small realistic delta: one change, one delete, one create.
        fs::write(tmp.path().join("file00000.txt"), b"rewritten").unwrap();
        fs::remove_file(tmp.path().join("file00001.txt")).unwrap();
        fs::write(tmp.path().join("fresh.txt"), b"new").unwrap();
        let new = DirSnapshot::capture(tmp.path()).unwrap();

        c.bench_function(&format!("snapshot_diff_{entries}"), |b| {
            b.iter(|| black_box(old.diff(&new)));
        });
    }
}

criterion_group!(benches, bench_capture, bench_diff);
criterion_main!(benches);
