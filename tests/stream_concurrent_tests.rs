//! Integration tests for `zip`, `merge` and `awake_every` on real threads.

#![cfg(all(feature = "rayon", feature = "tokio"))]

use effstream::effect::{Completion, Dispatcher, IO, RuntimeConfig, ThreadPool, Timer, TokioTimer};
use effstream::stream::Stream;
use rstest::{fixture, rstest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[fixture]
fn pool() -> Arc<dyn Dispatcher> {
    let config = RuntimeConfig::default()
        .with_worker_threads(4)
        .with_thread_name_prefix("stream-test");
    Arc::new(ThreadPool::new(&config).unwrap())
}

#[fixture]
fn timer() -> Arc<dyn Timer> {
    Arc::new(TokioTimer::new(&RuntimeConfig::default()).unwrap())
}

fn after<T: effstream::effect::Value>(millis: u64, value: T) -> IO<T> {
    IO::delay(move || {
        thread::sleep(Duration::from_millis(millis));
        value.clone()
    })
}

#[rstest]
fn test_zip_evaluates_pairs_concurrently(pool: Arc<dyn Dispatcher>) {
    // Both sides of every pair wait for each other.
    let barrier = Arc::new(Barrier::new(2));
    let rendezvous = |value| {
        let barrier = Arc::clone(&barrier);
        IO::delay(move || {
            barrier.wait();
            value
        })
    };
    let numbers = Stream::eval([rendezvous(1), rendezvous(2)]);
    let letters = Stream::eval([rendezvous(10), rendezvous(20), rendezvous(30)]);
    let zipped = Stream::zip(&pool, numbers, letters);
    assert_eq!(zipped.to_vec().run().unwrap(), vec![(1, 10), (2, 20)]);
}

#[rstest]
fn test_zip_with_infinite_side(pool: Arc<dyn Dispatcher>) {
    let naturals = Stream::unfold(0_u32, |n| Some((n, n + 1)));
    let zipped = Stream::zip_with(&pool, naturals, Stream::of(["a", "b", "c"]), |n, s| format!("{s}{n}"));
    assert_eq!(zipped.to_vec().run().unwrap(), vec!["a0", "b1", "c2"]);
}

#[rstest]
fn test_merge_emits_in_completion_order(pool: Arc<dyn Dispatcher>) {
    let fast = Stream::of([1, 2]);
    let slow = Stream::eval([after(200, 100)]);
    let merged = Stream::merge(&pool, fast, slow);
    assert_eq!(merged.to_vec().run().unwrap(), vec![1, 2, 100]);
}

#[rstest]
fn test_merge_interleaves_timed_sources(pool: Arc<dyn Dispatcher>) {
    let early = Stream::eval([after(10, "a1"), after(150, "a2")]);
    let late = Stream::eval([after(80, "b1")]);
    let merged = Stream::merge(&pool, early, late);
    assert_eq!(merged.to_vec().run().unwrap(), vec!["a1", "b1", "a2"]);
}

#[rstest]
fn test_merge_runs_every_element_once(pool: Arc<dyn Dispatcher>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counted = |value: i32| {
        let runs = Arc::clone(&runs);
        IO::delay(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            value
        })
    };
    let left = Stream::eval([counted(1), counted(2), counted(3)]);
    let right = Stream::eval([counted(4), counted(5)]);
    let mut values = Stream::merge(&pool, left, right).to_vec().run().unwrap();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
    assert_eq!(runs.load(Ordering::SeqCst), 5);
}

#[rstest]
fn test_merge_with_slow_side_pending_for_many_rounds(pool: Arc<dyn Dispatcher>) {
    const ROUNDS: i64 = 30_000;
    let gate: Completion<()> = Completion::new();
    let opener = gate.clone();
    let fast = Stream::of(0..ROUNDS).map(move |x| {
        if x == ROUNDS - 1 {
            opener.succeed(());
        }
        x
    });
    let slow = Stream::eval([IO::delay(move || {
        gate.wait().unwrap();
        -1
    })]);

    let values = Stream::merge(&pool, fast, slow).to_vec().run().unwrap();
    assert_eq!(values.len(), ROUNDS as usize + 1);
    assert!(values.contains(&-1));
    let fast_side: Vec<i64> = values.into_iter().filter(|x| *x >= 0).collect();
    assert_eq!(fast_side, (0..ROUNDS).collect::<Vec<_>>());
}

#[rstest]
fn test_awake_every_paces_elements(timer: Arc<dyn Timer>) {
    let started = Instant::now();
    Stream::awake_every(&timer, Duration::from_millis(20))
        .take(3)
        .drain()
        .run()
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[rstest]
fn test_awake_every_zipped_with_values(pool: Arc<dyn Dispatcher>, timer: Arc<dyn Timer>) {
    let ticks = Stream::awake_every(&timer, Duration::from_millis(5));
    let labelled = Stream::zip_with(&pool, ticks, Stream::of(["x", "y"]), |(), label| label);
    assert_eq!(labelled.to_vec().run().unwrap(), vec!["x", "y"]);
}
