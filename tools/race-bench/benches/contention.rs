//! CONTEXT: Contention micro-benchmark
//! INTENT: Compare the spin lock against a parking mutex under contention
//! DEPS: criterion (benchmarking), race-sync (spin lock), parking_lot (mutex)
//! READINESS: Benchmark suite; run with `cargo bench`

use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use parking_lot::Mutex;
use race_sync::SpinLock;

const THREADS: usize = 4;
const INCREMENTS: usize = 1_000;

fn spin_lock_increments() -> u64 {
    let counter = SpinLock::new(0_u64);
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..INCREMENTS {
                    *counter.lock() += 1;
                }
            });
        }
    });
    counter.into_inner()
}

fn mutex_increments() -> u64 {
    let counter = Mutex::new(0_u64);
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..INCREMENTS {
                    *counter.lock() += 1;
                }
            });
        }
    });
    counter.into_inner()
}

fn contention_bench(c: &mut Criterion) {
    c.bench_function("spin-lock-4x1000", |b| b.iter(spin_lock_increments));
    c.bench_function("parking-lot-mutex-4x1000", |b| b.iter(mutex_increments));
}

criterion_group!(benches, contention_bench);
criterion_main!(benches);
