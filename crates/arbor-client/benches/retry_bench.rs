// Benchmarks for the retry layer
// Measures backoff schedule computation and strategy overhead on the happy path

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use arbor_client::{
    CreateMode, DelayRetryPolicy, MemoryProvider, Provider, RetryStrategy, SyncRetryStrategy,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn bench_policy_delay(c: &mut Criterion) {
    let policy = DelayRetryPolicy::exponential(
        64,
        Duration::from_millis(10),
        2.0,
        Duration::from_secs(30),
    );

    let mut group = c.benchmark_group("policy_delay");
    for index in [0u32, 8, 63] {
        group.bench_with_input(BenchmarkId::from_parameter(index), &index, |b, &index| {
            b.iter(|| black_box(policy.delay(black_box(index))))
        });
    }
    group.finish();
}

fn bench_policy_decide(c: &mut Criterion) {
    let policy = DelayRetryPolicy::fixed(3, Duration::from_millis(10));

    c.bench_function("policy_decide", |b| {
        b.iter(|| {
            for retries in 0..5 {
                black_box(policy.decide(black_box(retries)));
            }
        })
    });
}

fn bench_update_no_faults(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let memory = Arc::new(MemoryProvider::new());
    rt.block_on(memory.create("/bench", "", CreateMode::Persistent))
        .unwrap();
    let strategy = SyncRetryStrategy::new(
        memory,
        Arc::new(DelayRetryPolicy::fixed(3, Duration::from_millis(10))),
    );

    c.bench_function("sync_update_no_faults", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(strategy.update("/bench", "value").await)
        })
    });
}

fn bench_create_all_need_path_existing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let memory = Arc::new(MemoryProvider::new());
    let strategy = SyncRetryStrategy::new(
        memory,
        Arc::new(DelayRetryPolicy::fixed(3, Duration::from_millis(10))),
    );
    rt.block_on(strategy.create_all_need_path("/a/b/c/d/e", "v", CreateMode::Persistent))
        .unwrap();

    c.bench_function("create_all_need_path_existing_depth_5", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(
                strategy
                    .create_all_need_path("/a/b/c/d/e", "v", CreateMode::Persistent)
                    .await,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_policy_delay,
    bench_policy_decide,
    bench_update_no_faults,
    bench_create_all_need_path_existing,
);

criterion_main!(benches);
