use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dimcount::table::ShardedTable;
use dimcount::{Counter, CounterConfig};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

const NUM_THREADS: usize = 8;
const ITERATIONS_PER_THREAD: usize = 100_000;
const NUM_KEYS: u64 = 1_024;

fn bench_table_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_increment");

    group.bench_function(
        BenchmarkId::new(
            "ShardedTable (32 shards)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let table = Arc::new(ShardedTable::new());
                let mut handles = vec![];

                for t in 0..NUM_THREADS {
                    let table_clone = Arc::clone(&table);
                    let handle = thread::spawn(move || {
                        for i in 0..ITERATIONS_PER_THREAD {
                            table_clone.increment((i as u64 + t as u64) % NUM_KEYS, 1);
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(table.len())
            })
        },
    );

    group.bench_function(
        BenchmarkId::new(
            "Mutex<HashMap> (single)",
            format!("{}threads x {}iter", NUM_THREADS, ITERATIONS_PER_THREAD),
        ),
        |b| {
            b.iter(|| {
                let map = Arc::new(Mutex::new(FxHashMap::<u64, i64>::default()));
                let mut handles = vec![];

                for t in 0..NUM_THREADS {
                    let map_clone = Arc::clone(&map);
                    let handle = thread::spawn(move || {
                        for i in 0..ITERATIONS_PER_THREAD {
                            *map_clone
                                .lock()
                                .entry((i as u64 + t as u64) % NUM_KEYS)
                                .or_insert(0) += 1;
                        }
                    });
                    handles.push(handle);
                }

                for handle in handles {
                    handle.join().unwrap();
                }

                black_box(map.lock().len())
            })
        },
    );

    group.finish();
}

fn bench_counter_export(c: &mut Criterion) {
    let counter = Counter::new(
        &["event_time", "id", "host"],
        &["t", "i", "s"],
        "requests",
        CounterConfig::default(),
    )
    .unwrap();
    let day = Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap();
    for id in 0..10_000i64 {
        counter
            .increment(1, (day, id, format!("host-{}", id % 64)))
            .unwrap();
    }

    c.bench_function("counter_export_10k_rows", |b| {
        b.iter(|| black_box(counter.export().unwrap().num_rows()))
    });
}

criterion_group!(benches, bench_table_increment, bench_counter_export);
criterion_main!(benches);
