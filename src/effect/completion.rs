//! A write-once result cell shared between producers and consumers.
//!
//! [`Completion`] starts empty and is resolved once with a success or a
//! failure. Consumers register callbacks, block on the cell, or turn it into
//! an [`IO`] that waits for the outcome without re-running whatever produced
//! it. This is how the concurrent combinators hand results across threads.
//!
//! # Examples
//!
//! ```rust
//! use effstream::effect::Completion;
//! use std::thread;
//!
//! let cell = Completion::new();
//! let writer = cell.clone();
//! thread::spawn(move || {
//!     writer.succeed(7);
//! });
//! assert_eq!(cell.wait().unwrap(), 7);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use super::dispatcher::Dispatcher;
use super::error::Error;
use super::io::{Callback, IO, Value};

/// Most cells have one or two listeners: a joining branch and a waiter.
const INLINE_CALLBACKS: usize = 2;

/// A thread-safe, write-once outcome.
///
/// Cloning a `Completion` yields another handle to the same cell.
///
/// # Invariants
///
/// - The first call to [`complete`](Self::complete) wins; later calls are
///   ignored and return `false`.
/// - Every registered callback is invoked exactly once with the final outcome.
/// - Callbacks run outside the internal lock.
pub struct Completion<T: Value> {
    shared: Arc<Shared<T>>,
}

struct Shared<T: Value> {
    completed: AtomicBool,
    state: Mutex<State<T>>,
    signal: Condvar,
}

struct State<T: Value> {
    outcome: Option<Result<T, Error>>,
    callbacks: SmallVec<[Callback<T>; INLINE_CALLBACKS]>,
}

impl<T: Value> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Value> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> Completion<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                completed: AtomicBool::new(false),
                state: Mutex::new(State {
                    outcome: None,
                    callbacks: SmallVec::new(),
                }),
                signal: Condvar::new(),
            }),
        }
    }

    /// Creates a cell that is already resolved.
    pub fn resolved(outcome: Result<T, Error>) -> Self {
        let completion = Self::new();
        completion.complete(outcome);
        completion
    }

    /// Resolves the cell.
    ///
    /// Returns `true` if this call stored the outcome, `false` if the cell was
    /// already resolved (in which case `outcome` is discarded).
    pub fn complete(&self, outcome: Result<T, Error>) -> bool {
        let mut callbacks = {
            let mut state = self.shared.state.lock();
            if state.outcome.is_some() {
                tracing::debug!("completion already resolved; ignoring later outcome");
                return false;
            }
            state.outcome = Some(outcome.clone());
            self.shared.completed.store(true, Ordering::Release);
            std::mem::take(&mut state.callbacks)
        };
        self.shared.signal.notify_all();

        if let Some(last) = callbacks.pop() {
            for callback in callbacks {
                callback(outcome.clone());
            }
            last(outcome);
        }
        true
    }

    /// Resolves the cell with a value.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Resolves the cell with a failure.
    pub fn fail(&self, error: Error) -> bool {
        self.complete(Err(error))
    }

    /// Registers a callback for the outcome.
    ///
    /// If the cell is already resolved the callback runs immediately on the
    /// calling thread.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, Error>) + Send + 'static,
    {
        let ready = {
            let mut state = self.shared.state.lock();
            match &state.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(ready);
    }

    /// Returns `true` once the cell holds an outcome.
    pub fn is_completed(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Returns the outcome if the cell is resolved.
    pub fn peek(&self) -> Option<Result<T, Error>> {
        self.shared.state.lock().outcome.clone()
    }

    /// Blocks the calling thread until the cell is resolved.
    pub fn wait(&self) -> Result<T, Error> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            self.shared.signal.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout`; returns `None` if the cell is still empty.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, Error>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return Some(outcome.clone());
            }
            if self.shared.signal.wait_until(&mut state, deadline).timed_out() {
                return state.outcome.clone();
            }
        }
    }

    /// An effect that waits for this cell's outcome.
    ///
    /// Running the effect never re-runs the producer; every run observes the
    /// same outcome.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::Completion;
    ///
    /// let cell = Completion::new();
    /// cell.succeed("done");
    /// let io = cell.to_io();
    /// assert_eq!(io.run().unwrap(), "done");
    /// assert_eq!(io.run().unwrap(), "done");
    /// ```
    pub fn to_io(&self) -> IO<T> {
        let completion = self.clone();
        IO::from_callback(move |callback| completion.on_complete(callback))
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for Completion<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Completion")
            .field("outcome", &self.peek())
            .finish()
    }
}

/// Runs `thunk` on `dispatcher` and returns the cell that receives its result.
///
/// A panic inside `thunk` resolves the cell with [`Error::Panicked`].
///
/// # Examples
///
/// ```rust
/// use effstream::effect::{run_async, InlineDispatcher};
///
/// let cell = run_async(&InlineDispatcher, || Ok(2 + 2));
/// assert_eq!(cell.wait().unwrap(), 4);
/// ```
pub fn run_async<T, F>(dispatcher: &dyn Dispatcher, thunk: F) -> Completion<T>
where
    T: Value,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    let completion = Completion::new();
    let writer = completion.clone();
    dispatcher.dispatch(Box::new(move || {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(thunk))
            .unwrap_or_else(|payload| Err(Error::from_panic(payload)));
        writer.complete(outcome);
    }));
    completion
}
