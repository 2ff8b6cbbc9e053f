//! Whole-file loader benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rdbkit_core::{DecodeOptions, Value};
use rdbkit_loader::{Loader, RdbWriter};
use std::io::Write;
use tempfile::NamedTempFile;

fn build_file(keys: usize) -> Vec<u8> {
    let mut w = RdbWriter::new(Vec::new()).unwrap();
    w.write_aux("redis-ver", "7.2.4").unwrap();
    w.select_db(0).unwrap();
    w.resize_db(keys as u64, 0).unwrap();
    for i in 0..keys {
        let key = format!("key:{i}");
        let value = Value::string(format!("value-{i}").as_str());
        let expiry = (i % 4 == 0).then_some(1_900_000_000_000 + i as i64);
        w.write_entry(key.as_bytes(), &value, expiry).unwrap();
    }
    w.finish().unwrap()
}

fn bench_load_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("loader_memory");

    for keys in [100, 10_000] {
        let bytes = build_file(keys);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &bytes, |b, bytes| {
            b.iter(|| {
                let loader = Loader::new(&bytes[..]).unwrap();
                black_box(loader.map(|r| r.unwrap()).count())
            });
        });
    }

    group.finish();
}

fn bench_load_file(c: &mut Criterion) {
    let mut file = NamedTempFile::new().unwrap();
    let bytes = build_file(10_000);
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let mut group = c.benchmark_group("loader_file");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("10000_keys", |b| {
        b.iter(|| {
            let loader = Loader::open(file.path(), DecodeOptions::default()).unwrap();
            black_box(loader.map(|r| r.unwrap()).count())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_load_memory, bench_load_file);
criterion_main!(benches);
