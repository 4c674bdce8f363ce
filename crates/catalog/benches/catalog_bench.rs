//! Catalog ingestion and query benchmarks

use catalog::{PhotoCatalog, PhotoEntry};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

fn seeded_catalog(size: u64) -> PhotoCatalog {
    let catalog = PhotoCatalog::new();
    for i in 0..size {
        catalog.ingest(Arc::new(PhotoEntry::new(
            PathBuf::from(format!("/photos/{i}.jpg")),
            UNIX_EPOCH + Duration::from_secs(i),
        )));
    }
    catalog
}

fn bench_ingest(c: &mut Criterion) {
    c.bench_function("ingest_new_entry", |b| {
        let catalog = seeded_catalog(10_000);
        let mut i = 10_000u64;
        b.iter(|| {
            i += 1;
            let entry = Arc::new(PhotoEntry::new(
                PathBuf::from(format!("/photos/{i}.jpg")),
                UNIX_EPOCH + Duration::from_secs(i),
            ));
            black_box(catalog.ingest(entry))
        });
    });

    c.bench_function("ingest_duplicate_entry", |b| {
        let catalog = seeded_catalog(10_000);
        let duplicate = Arc::new(PhotoEntry::new(
            PathBuf::from("/photos/5000.jpg"),
            UNIX_EPOCH + Duration::from_secs(5000),
        ));
        b.iter(|| black_box(catalog.ingest(duplicate.clone())));
    });
}

fn bench_recent(c: &mut Criterion) {
    c.bench_function("recent_10_of_10k", |b| {
        let catalog = seeded_catalog(10_000);
        b.iter(|| black_box(catalog.recent(10).unwrap()));
    });
}

criterion_group!(benches, bench_ingest, bench_recent);
criterion_main!(benches);
