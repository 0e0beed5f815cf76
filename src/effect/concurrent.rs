//! Parallel composition of effects.
//!
//! - [`both`]: run two effects concurrently and wait for both
//! - [`race`]: run two effects concurrently and report the first to finish
//! - [`seq`]: `race` for two effects of the same type
//! - [`race_completions`]: `race` over cells that are already running
//! - [`sleep`]: suspend without blocking a thread
//!
//! Each combinator returns a lazy [`IO`]; the branches are submitted to the
//! dispatcher only when that `IO` is run, and again on every run.
//!
//! # Examples
//!
//! ```rust
//! use effstream::effect::{both, Dispatcher, InlineDispatcher, IO};
//! use std::sync::Arc;
//!
//! let dispatcher: Arc<dyn Dispatcher> = Arc::new(InlineDispatcher);
//! let pair = both(&dispatcher, IO::pure(1), IO::pure("one"));
//! assert_eq!(pair.run().unwrap(), (1, "one"));
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::completion::Completion;
use super::dispatcher::{Dispatcher, Timer};
use super::io::{IO, Value};
use crate::control::Or;

/// The outcome of [`race`]: the winner's value and the loser's pending effect.
pub type Raced<A, B> = Or<(A, IO<B>), (IO<A>, B)>;

/// The outcome of [`race_completions`]: the winner's value and the other cell.
pub type RacedCompletions<A, B> = Or<(A, Completion<B>), (Completion<A>, B)>;

/// The outcome of [`seq`]: the winner's value and the other side's pending effect.
pub type Sequenced<T> = Or<(T, IO<T>), (T, IO<T>)>;

/// Runs both effects concurrently on `dispatcher` and pairs their results.
///
/// The first failure of either branch fails the pair immediately; the other
/// branch keeps running but its outcome is discarded.
pub fn both<A: Value, B: Value>(
    dispatcher: &Arc<dyn Dispatcher>,
    first: IO<A>,
    second: IO<B>,
) -> IO<(A, B)> {
    let dispatcher = Arc::clone(dispatcher);
    IO::from_callback(move |callback| {
        let join = Arc::new(Join::new());
        let left = first.start(dispatcher.as_ref());
        let right = second.start(dispatcher.as_ref());

        let left_join = Arc::clone(&join);
        left.on_complete(move |outcome| match outcome {
            Ok(value) => left_join.offer_left(value),
            Err(error) => {
                left_join.joined.fail(error);
            }
        });
        let right_join = Arc::clone(&join);
        right.on_complete(move |outcome| match outcome {
            Ok(value) => right_join.offer_right(value),
            Err(error) => {
                right_join.joined.fail(error);
            }
        });

        join.joined.on_complete(callback);
    })
}

/// Collects the two halves of a [`both`].
struct Join<A: Value, B: Value> {
    halves: Mutex<(Option<A>, Option<B>)>,
    joined: Completion<(A, B)>,
}

impl<A: Value, B: Value> Join<A, B> {
    fn new() -> Self {
        Self {
            halves: Mutex::new((None, None)),
            joined: Completion::new(),
        }
    }

    fn offer_left(&self, value: A) {
        let ready = {
            let mut halves = self.halves.lock();
            match halves.1.take() {
                Some(right) => Some((value, right)),
                None => {
                    halves.0 = Some(value);
                    None
                }
            }
        };
        if let Some(pair) = ready {
            self.joined.succeed(pair);
        }
    }

    fn offer_right(&self, value: B) {
        let ready = {
            let mut halves = self.halves.lock();
            match halves.0.take() {
                Some(left) => Some((left, value)),
                None => {
                    halves.1 = Some(value);
                    None
                }
            }
        };
        if let Some(pair) = ready {
            self.joined.succeed(pair);
        }
    }
}

/// Runs both effects concurrently and completes with whichever finishes first.
///
/// A failure counts as finishing: if the first branch to finish fails, the
/// race fails. The loser keeps running; its outcome is available through the
/// pending `IO` in the result, which waits for it without re-running it.
///
/// # Examples
///
/// ```rust
/// use effstream::control::Or;
/// use effstream::effect::{race, Dispatcher, InlineDispatcher, IO};
/// use std::sync::Arc;
///
/// // Inline dispatch finishes the first branch before the second starts.
/// let dispatcher: Arc<dyn Dispatcher> = Arc::new(InlineDispatcher);
/// match race(&dispatcher, IO::pure(1), IO::pure("slow")).run().unwrap() {
///     Or::Left((winner, pending)) => {
///         assert_eq!(winner, 1);
///         assert_eq!(pending.run().unwrap(), "slow");
///     }
///     Or::Right(_) => unreachable!(),
/// }
/// ```
pub fn race<A: Value, B: Value>(
    dispatcher: &Arc<dyn Dispatcher>,
    first: IO<A>,
    second: IO<B>,
) -> IO<Raced<A, B>> {
    let dispatcher = Arc::clone(dispatcher);
    IO::suspend(move || {
        let left = first.start(dispatcher.as_ref());
        let right = second.start(dispatcher.as_ref());
        race_completions(&left, &right).map(|outcome| match outcome {
            Or::Left((value, pending)) => Or::Left((value, pending.to_io())),
            Or::Right((pending, value)) => Or::Right((pending.to_io(), value)),
        })
    })
}

/// Waits for whichever of two running cells resolves first.
///
/// Nothing is started or re-run: the effect only listens to the cells, and
/// hands back the other cell untouched so a later round can race it again.
/// A failure counts as finishing, as in [`race`].
///
/// # Examples
///
/// ```rust
/// use effstream::control::Or;
/// use effstream::effect::{race_completions, Completion};
///
/// let pending: Completion<i32> = Completion::new();
/// let done = Completion::resolved(Ok("done"));
/// match race_completions(&pending, &done).run().unwrap() {
///     Or::Right((still_pending, value)) => {
///         assert_eq!(value, "done");
///         assert!(!still_pending.is_completed());
///     }
///     Or::Left(_) => unreachable!(),
/// }
/// ```
pub fn race_completions<A: Value, B: Value>(
    first: &Completion<A>,
    second: &Completion<B>,
) -> IO<RacedCompletions<A, B>> {
    let first = first.clone();
    let second = second.clone();
    IO::from_callback(move |callback| {
        let winner: Completion<RacedCompletions<A, B>> = Completion::new();

        let left_winner = winner.clone();
        let right_pending = second.clone();
        first.on_complete(move |outcome| {
            if !left_winner.is_completed() {
                left_winner.complete(outcome.map(|value| Or::Left((value, right_pending))));
            }
        });

        let right_winner = winner.clone();
        let left_pending = first.clone();
        second.on_complete(move |outcome| {
            if !right_winner.is_completed() {
                right_winner.complete(outcome.map(|value| Or::Right((left_pending, value))));
            }
        });

        winner.on_complete(callback);
    })
}

/// Races two effects of the same type.
///
/// `Left` means `first` finished first; either way the winner's value comes
/// first in the pair and the other side's pending effect second, so
/// [`Or::flatten`] yields `(winner, pending)`.
pub fn seq<T: Value>(
    dispatcher: &Arc<dyn Dispatcher>,
    first: IO<T>,
    second: IO<T>,
) -> IO<Sequenced<T>> {
    race(dispatcher, first, second).map(|outcome| match outcome {
        Or::Left((value, pending)) => Or::Left((value, pending)),
        Or::Right((pending, value)) => Or::Right((value, pending)),
    })
}

/// An effect that completes after `duration` without holding a thread.
pub fn sleep(timer: &Arc<dyn Timer>, duration: Duration) -> IO<()> {
    let timer = Arc::clone(timer);
    IO::from_callback(move |callback| {
        tracing::trace!(?duration, "scheduling sleep");
        timer.schedule(duration, Box::new(move || callback(Ok(()))));
    })
}

/// [`sleep`] with the duration given in milliseconds.
pub fn sleep_millis(timer: &Arc<dyn Timer>, millis: u64) -> IO<()> {
    sleep(timer, Duration::from_millis(millis))
}
