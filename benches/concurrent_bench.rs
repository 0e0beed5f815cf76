//! Benchmark for parallel composition on the worker pool.
//!
//! Measures dispatch overhead of `both`/`race` and of the concurrent stream
//! combinators. The work per effect is tiny, so these numbers are dominated
//! by hand-off cost rather than parallel speedup.
//!
//! Requires the `rayon` feature to be enabled.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use effstream::effect::{Dispatcher, IO, InlineDispatcher, RuntimeConfig, ThreadPool, both, race};
use effstream::stream::Stream;
use std::hint::black_box;
use std::sync::Arc;

fn pool() -> Arc<dyn Dispatcher> {
    let config = RuntimeConfig::default().with_thread_name_prefix("bench");
    Arc::new(ThreadPool::new(&config).expect("worker pool"))
}

// =============================================================================
// Effect Combinators
// =============================================================================

fn benchmark_both(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("both");
    let dispatchers: [(&str, Arc<dyn Dispatcher>); 2] =
        [("inline", Arc::new(InlineDispatcher)), ("pool", pool())];

    for (name, dispatcher) in &dispatchers {
        group.bench_function(*name, |bencher| {
            bencher.iter(|| {
                let pair = both(dispatcher, IO::pure(black_box(1)), IO::delay(|| 2));
                black_box(pair.run_unsafe())
            });
        });
    }

    group.finish();
}

fn benchmark_race(criterion: &mut Criterion) {
    let dispatcher = pool();

    criterion.bench_function("race_pool", |bencher| {
        bencher.iter(|| {
            let raced = race(&dispatcher, IO::pure(black_box(1)), IO::pure(2));
            black_box(raced.run_unsafe().is_left())
        });
    });
}

fn benchmark_nested_both(criterion: &mut Criterion) {
    fn fan_out(dispatcher: &Arc<dyn Dispatcher>, depth: u32) -> IO<u64> {
        if depth == 0 {
            IO::pure(1)
        } else {
            both(
                dispatcher,
                fan_out(dispatcher, depth - 1),
                fan_out(dispatcher, depth - 1),
            )
            .map(|(left, right)| left + right)
        }
    }

    let dispatcher = pool();
    let mut group = criterion.benchmark_group("both_fan_out");

    for depth in [2_u32, 4, 6] {
        let io = fan_out(&dispatcher, depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &io, |bencher, io| {
            bencher.iter(|| black_box(io.run_unsafe()));
        });
    }

    group.finish();
}

// =============================================================================
// Concurrent Streams
// =============================================================================

fn benchmark_stream_zip_merge(criterion: &mut Criterion) {
    let dispatcher = pool();
    let mut group = criterion.benchmark_group("stream_concurrent");

    group.bench_function("zip_100", |bencher| {
        bencher.iter(|| {
            let zipped = Stream::zip(&dispatcher, Stream::of(0..100), Stream::of(100..200));
            black_box(zipped.drain().run_unsafe())
        });
    });

    group.bench_function("merge_100", |bencher| {
        bencher.iter(|| {
            let merged = Stream::merge(&dispatcher, Stream::of(0..50), Stream::of(50..100));
            black_box(merged.drain().run_unsafe())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_both,
    benchmark_race,
    benchmark_nested_both,
    benchmark_stream_zip_merge,
);

criterion_main!(benches);
