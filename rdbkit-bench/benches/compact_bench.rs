//! Packed encoding benchmarks: validation and iteration.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rdbkit_codec::RawRef;
use rdbkit_core::{Intset, Listpack, Ziplist};

fn entries(len: usize) -> Vec<String> {
    (0..len)
        .map(|i| if i % 2 == 0 { i.to_string() } else { format!("value-{i}") })
        .collect()
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact_validate");

    for len in [16, 128, 512] {
        let items = entries(len);
        let raw = items.iter().map(|s| RawRef::Bytes(s.as_bytes()));
        let zl: Bytes = Ziplist::from_entries(raw.clone()).as_bytes().clone();
        let lp: Bytes = Listpack::from_entries(raw).as_bytes().clone();

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("ziplist", len), &zl, |b, zl| {
            b.iter(|| black_box(Ziplist::new(zl.clone()).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("listpack", len), &lp, |b, lp| {
            b.iter(|| black_box(Listpack::new(lp.clone()).unwrap()));
        });
    }

    group.finish();
}

fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact_iterate");

    for len in [16, 128, 512] {
        let items = entries(len);
        let raw = items.iter().map(|s| RawRef::Bytes(s.as_bytes()));
        let zl = Ziplist::from_entries(raw.clone());
        let lp = Listpack::from_entries(raw);
        let is = Intset::from_values((0..len as i64).map(|i| i * 1_000_003));

        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("ziplist", len), &zl, |b, zl| {
            b.iter(|| zl.iter().map(|e| black_box(e.unwrap())).count());
        });
        group.bench_with_input(BenchmarkId::new("listpack", len), &lp, |b, lp| {
            b.iter(|| lp.iter().map(|e| black_box(e.unwrap())).count());
        });
        group.bench_with_input(BenchmarkId::new("intset_contains", len), &is, |b, is| {
            b.iter(|| black_box(is.contains(black_box(7 * 1_000_003))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validate, bench_iterate);
criterion_main!(benches);
