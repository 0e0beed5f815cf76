//! Integration tests for `IO`: laziness, sequencing, recovery and the run
//! boundary.

use effstream::effect::{Error, IO, InlineDispatcher};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, thiserror::Error)]
#[error("quota exceeded: {used}/{limit}")]
struct QuotaExceeded {
    used: u32,
    limit: u32,
}

fn counting(counter: &Arc<AtomicUsize>, value: i32) -> IO<i32> {
    let counter = Arc::clone(counter);
    IO::delay(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        value
    })
}

// =============================================================================
// Laziness
// =============================================================================

#[rstest]
fn test_building_runs_nothing() {
    let counter = Arc::new(AtomicUsize::new(0));
    let _io = counting(&counter, 1)
        .map(|x| x + 1)
        .flat_map(|x| IO::pure(x * 2))
        .recover(|_| Some(0));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[rstest]
fn test_each_run_reevaluates() {
    let counter = Arc::new(AtomicUsize::new(0));
    let io = counting(&counter, 5).map(|x| x * 3);
    assert_eq!(io.run().unwrap(), 15);
    assert_eq!(io.run().unwrap(), 15);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_shared_subexpression_runs_per_reference() {
    let counter = Arc::new(AtomicUsize::new(0));
    let shared = counting(&counter, 1);
    let io = shared.clone().product(shared);
    assert_eq!(io.run().unwrap(), (1, 1));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[rstest]
fn test_suspend_defers_construction() {
    let built = Arc::new(AtomicUsize::new(0));
    let built_clone = Arc::clone(&built);
    let io = IO::suspend(move || {
        built_clone.fetch_add(1, Ordering::SeqCst);
        IO::pure("built")
    });
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert_eq!(io.run().unwrap(), "built");
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Sequencing
// =============================================================================

#[rstest]
fn test_then_discards_previous_result() {
    let counter = Arc::new(AtomicUsize::new(0));
    let io = counting(&counter, 1).then(|| IO::pure("next"));
    assert_eq!(io.run().unwrap(), "next");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_map2_runs_left_then_right() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let left_log = Arc::clone(&order);
    let right_log = Arc::clone(&order);
    let left = IO::delay(move || left_log.lock().push("left"));
    let right = IO::delay(move || right_log.lock().push("right"));
    left.map2(right, |(), ()| ()).run().unwrap();
    assert_eq!(*order.lock(), vec!["left", "right"]);
}

// =============================================================================
// Errors and recovery
// =============================================================================

#[rstest]
fn test_unrecovered_error_keeps_identity() {
    let error = Error::msg("lost connection");
    let io = IO::pure(1)
        .flat_map({
            let error = error.clone();
            move |_| IO::<i32>::raise_error(error.clone())
        })
        .map(|x| x + 1);
    assert!(io.run().unwrap_err().ptr_eq(&error));
}

#[rstest]
fn test_attempt_converts_error_value() {
    let io = IO::attempt(|| -> Result<u32, QuotaExceeded> { Err(QuotaExceeded { used: 11, limit: 10 }) });
    let error = io.run().unwrap_err();
    let quota = error.downcast_ref::<QuotaExceeded>().unwrap();
    assert_eq!((quota.used, quota.limit), (11, 10));
    assert_eq!(error.to_string(), "quota exceeded: 11/10");
}

#[rstest]
fn test_recover_skips_failed_suffix() {
    let counter = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::clone(&counter);
    let io = IO::<i32>::raise_error(Error::msg("early"))
        .map(move |x| {
            skipped.fetch_add(1, Ordering::SeqCst);
            x
        })
        .recover(|_| Some(-1))
        .map(|x| x * 10);
    assert_eq!(io.run().unwrap(), -10);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[rstest]
fn test_declining_handler_propagates_original() {
    let error = Error::msg("not mine");
    let io = IO::<i32>::raise_error(error.clone()).recover(|_| None);
    assert!(io.run().unwrap_err().ptr_eq(&error));
}

#[rstest]
fn test_nested_recover_handles_innermost_first() {
    let io = IO::<&str>::raise_error(Error::msg("inner"))
        .recover_with(|error| (error.to_string() == "inner").then(|| IO::raise_error(Error::msg("outer"))))
        .recover(|error| Some(if error.to_string() == "outer" { "outer handled" } else { "wrong" }));
    assert_eq!(io.run().unwrap(), "outer handled");
}

#[rstest]
fn test_handler_panic_replaces_error() {
    let io = IO::<i32>::raise_error(Error::msg("first")).recover(|_| panic!("handler exploded"));
    let error = io.run().unwrap_err();
    assert!(error.is_panic());
    assert_eq!(error.to_string(), "effect panicked: handler exploded");
}

#[rstest]
fn test_delay_panic_is_recoverable() {
    let io = IO::delay(|| -> u8 { panic!("thunk exploded") }).recover(|error| error.is_panic().then_some(0));
    assert_eq!(io.run().unwrap(), 0);
}

#[rstest]
fn test_attempt_result_materializes_failure() {
    let failed = IO::<i32>::raise_error(Error::msg("visible")).attempt_result().run().unwrap();
    assert_eq!(failed.unwrap_err().to_string(), "visible");
    let succeeded = IO::pure(3).attempt_result().run().unwrap();
    assert_eq!(succeeded.unwrap(), 3);
}

// =============================================================================
// Run boundary
// =============================================================================

#[rstest]
fn test_run_with_delivers_outcome() {
    let (sender, receiver) = std::sync::mpsc::channel();
    IO::pure(9).map(|x| x + 1).run_with(move |outcome| sender.send(outcome).unwrap());
    assert_eq!(receiver.recv().unwrap().unwrap(), 10);
}

#[rstest]
fn test_start_returns_completed_cell() {
    let cell = IO::delay(|| "started").start(&InlineDispatcher);
    assert!(cell.is_completed());
    assert_eq!(cell.wait().unwrap(), "started");
}

#[rstest]
#[should_panic]
fn test_run_unsafe_panics_on_failure() {
    IO::<i32>::raise_error(Error::msg("boom")).run_unsafe();
}
