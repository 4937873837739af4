//! Full batch over a synthetic dataset, cold cache each iteration.
//!
//! Run with: `cargo bench --bench batch`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pdq::batch::{Materializer, OutputWriter};
use pdq::data::{FlatTable, RawTable, Snapshot, TableName, YearTable};
use pdq::indicators::Generation;

const YEARS: std::ops::Range<i32> = 2000..2024;
const COUNTRIES: usize = 60;

fn synthetic_table(seed: f64) -> YearTable {
    YEARS
        .map(|year| {
            let row = (0..COUNTRIES)
                .map(|c| {
                    let v = seed + (c as f64 + 1.0) * ((year - 1999) as f64).sqrt();
                    (format!("C{c:03}"), Some(v))
                })
                .collect();
            (year, row)
        })
        .collect()
}

fn synthetic_snapshot() -> Snapshot {
    let mut tables: Vec<(TableName, RawTable)> = TableName::ALL
        .into_iter()
        .filter(|name| !matches!(name, TableName::WorldTotal | TableName::Weight))
        .enumerate()
        .map(|(i, name)| (name, RawTable::Year(synthetic_table(i as f64 + 1.0))))
        .collect();

    let world: YearTable = YEARS
        .map(|year| {
            let row = [
                ("world_oa_total".to_string(), Some(1.0e6 + year as f64)),
                ("world_scientist".to_string(), Some(8.0e6)),
            ]
            .into_iter()
            .collect();
            (year, row)
        })
        .collect();
    tables.push((TableName::WorldTotal, RawTable::Year(world)));

    let weights: FlatTable = [("W_OA", 0.4), ("W_OD", 0.4), ("W_OP", 0.2)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Some(v)))
        .collect();
    tables.push((TableName::Weight, RawTable::Flat(weights)));

    Snapshot::from_tables(1, tables)
}

fn bench_batch(c: &mut Criterion) {
    let snapshot = Arc::new(synthetic_snapshot());
    let out = tempfile::tempdir().expect("tempdir");
    let output = OutputWriter::new(out.path());
    let materializer = Materializer::default();

    let mut group = c.benchmark_group("batch");
    group.sample_size(10);

    group.bench_function("cold_cache", |b| {
        b.iter(|| {
            let mut generation = Generation::new(Arc::clone(&snapshot));
            let mut ev = generation.evaluator().with_output(&output);
            black_box(materializer.run(&mut ev, &output))
        });
    });

    group.bench_function("warm_cache", |b| {
        let mut generation = Generation::new(Arc::clone(&snapshot));
        materializer.run(&mut generation.evaluator(), &output);
        b.iter(|| {
            let mut ev = generation.evaluator();
            black_box(materializer.run(&mut ev, &output))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_batch);
criterion_main!(benches);
