//! Benchmarks for the admission-controlled scheduler.
//!
//! Covers:
//! - Submission overhead while the scheduler is busy
//! - Burst throughput: admit a batch and drain it to completion

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use dispatch_gate::config::SchedulerConfig;
use dispatch_gate::core::{Scheduler, SubmitOptions, WorkError};
use dispatch_gate::runtime::TokioSpawner;

fn bench_config(max_concurrent: u32) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent,
        min_dispatch_interval_ms: 0,
        poll_interval_ms: 5,
        ..SchedulerConfig::default()
    }
}

fn submit_and_drain(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("submit_and_drain");
    for batch in [16u64, 64, 256] {
        group.throughput(Throughput::Elements(batch));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.to_async(&rt).iter(|| async move {
                let scheduler: Scheduler<u64, _> =
                    Scheduler::new(bench_config(8), TokioSpawner::current());
                let handles: Vec<_> = (0..batch)
                    .map(|i| {
                        scheduler.submit_fn(
                            move || async move { Ok::<u64, WorkError>(i) },
                            SubmitOptions::default().with_priority((i % 3) as i64),
                        )
                    })
                    .collect();
                let mut total = 0u64;
                for handle in handles {
                    total += handle.await.expect("task result");
                }
                black_box(total)
            });
        });
    }
    group.finish();
}

fn submission_overhead(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    c.bench_function("submit_while_busy", |b| {
        b.to_async(&rt).iter(|| async {
            let scheduler: Scheduler<u64, _> =
                Scheduler::new(bench_config(1), TokioSpawner::current());
            // Occupy the slot so submissions purely measure admission cost.
            let blocker = scheduler.submit_fn(
                || async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok::<u64, WorkError>(0)
                },
                SubmitOptions::default(),
            );
            let handles: Vec<_> = (0..32u64)
                .map(|i| {
                    scheduler.submit_fn(
                        move || async move { Ok::<u64, WorkError>(i) },
                        SubmitOptions::default(),
                    )
                })
                .collect();
            let mut total = blocker.await.expect("blocker result");
            for handle in handles {
                total += handle.await.expect("task result");
            }
            black_box(total)
        });
    });
}

criterion_group!(benches, submit_and_drain, submission_overhead);
criterion_main!(benches);
