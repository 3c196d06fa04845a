//! Benchmarks for listener dispatch.
//!
//! Run with: cargo bench -p vizkit-reactive --bench dispatch_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vizkit_reactive::{Dispatch, Observable};

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("observable/set");

    for listeners in [1usize, 8, 64] {
        let obs = Observable::new(0u64);
        for i in 0..listeners {
            obs.register((i % 7) as i32, |v| {
                black_box(*v);
                Ok(Dispatch::Continue)
            });
        }
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &obs, |b, obs| {
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                obs.set(black_box(n)).ok();
            })
        });
    }

    group.finish();
}

fn bench_consume_early(c: &mut Criterion) {
    let obs = Observable::new(0u64);
    obs.register(100, |_| Ok(Dispatch::Consume));
    for _ in 0..64 {
        obs.on(|v| {
            black_box(*v);
        });
    }
    c.bench_function("observable/set_consumed_at_top", |b| {
        b.iter(|| obs.set(black_box(1)).ok())
    });
}

fn bench_register_unregister(c: &mut Criterion) {
    let obs = Observable::new(0u64);
    for i in 0..32 {
        obs.register(i, |_| Ok(Dispatch::Continue));
    }
    c.bench_function("observable/register_unregister", |b| {
        b.iter(|| {
            let handle = obs.register(black_box(16), |_| Ok(Dispatch::Continue));
            black_box(handle.detach())
        })
    });
}

criterion_group!(benches, bench_set, bench_consume_early, bench_register_unregister);
criterion_main!(benches);
