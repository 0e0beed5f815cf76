//! Where effects run and when delayed work fires.
//!
//! The concurrent combinators never spawn threads themselves. They hand work
//! to a [`Dispatcher`] and delayed work to a [`Timer`], both supplied by the
//! caller. [`ThreadPool`](super::ThreadPool) and [`TokioTimer`](super::TokioTimer)
//! are the stock implementations; [`InlineDispatcher`] runs work on the
//! submitting thread, which makes interleavings deterministic in tests.

use std::sync::Arc;
use std::time::Duration;

/// A unit of work submitted to a dispatcher or timer.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes tasks, usually on other threads.
pub trait Dispatcher: Send + Sync {
    /// Submits `task` for execution. Must not block until the task finishes.
    fn dispatch(&self, task: Task);
}

/// Runs tasks after a delay.
pub trait Timer: Send + Sync {
    /// Submits `task` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, task: Task) {
        (**self).dispatch(task);
    }
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn schedule(&self, delay: Duration, task: Task) {
        (**self).schedule(delay, task);
    }
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// A timer that sleeps the calling thread before running the task.
///
/// Only useful for tests and single-threaded tools: `schedule` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingTimer;

impl Timer for BlockingTimer {
    fn schedule(&self, delay: Duration, task: Task) {
        std::thread::sleep(delay);
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[rstest]
    fn test_inline_dispatcher_runs_before_returning() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        InlineDispatcher.dispatch(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[rstest]
    fn test_shared_dispatcher_forwards() {
        let shared: Arc<dyn Dispatcher> = Arc::new(InlineDispatcher);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        shared.dispatch(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }
}
