//! Effects: deferred, composable, possibly asynchronous computations.
//!
//! # Building blocks
//!
//! - [`IO`]: a description of a computation; nothing runs until it is run
//! - [`Error`]: the failure channel shared by every effect
//! - [`Completion`]: a write-once cell that hands outcomes across threads
//! - [`both`], [`race`], [`seq`], [`sleep`]: concurrent composition
//! - [`Dispatcher`] / [`Timer`]: where concurrent branches and delays run
//!
//! # Running effects
//!
//! [`IO::run`] evaluates on the calling thread with a trampoline, so deep
//! `flat_map` chains and recursive `suspend`s do not grow the call stack.
//! Concurrent combinators submit their branches to a dispatcher and resume
//! the run when the branches report back.
//!
//! ```rust
//! use effstream::effect::{both, Dispatcher, IO, RuntimeConfig, ThreadPool};
//! use std::sync::Arc;
//!
//! let pool: Arc<dyn Dispatcher> =
//!     Arc::new(ThreadPool::new(&RuntimeConfig::default().with_worker_threads(2)).unwrap());
//!
//! let left = IO::delay(|| (1..=10).sum::<i32>());
//! let right = IO::delay(|| (11..=20).sum::<i32>());
//! let total = both(&pool, left, right).map(|(a, b)| a + b);
//!
//! assert_eq!(total.run().unwrap(), 210);
//! ```
//!
//! # Error handling
//!
//! Failures short-circuit the rest of a chain until a
//! [`recover`](IO::recover) or [`recover_with`](IO::recover_with) handler
//! accepts them. Panics inside thunks, continuations and handlers are
//! captured as [`Error::Panicked`] rather than unwinding through the caller.
//!
//! ```rust
//! use effstream::effect::IO;
//!
//! let io = IO::delay(|| -> i32 { panic!("sensor offline") })
//!     .recover(|error| error.is_panic().then_some(-1));
//! assert_eq!(io.run().unwrap(), -1);
//! ```

mod completion;
mod concurrent;
mod config;
mod dispatcher;
mod error;
mod interpreter;
mod io;
mod pool;

#[cfg(all(feature = "rayon", feature = "tokio"))]
pub mod runtime;

pub use completion::{Completion, run_async};
pub use concurrent::{
    Raced, RacedCompletions, Sequenced, both, race, race_completions, seq, sleep, sleep_millis,
};
pub use config::{RuntimeConfig, THREAD_NAME_VARIABLE, TIMER_THREADS_VARIABLE, WORKER_THREADS_VARIABLE};
pub use dispatcher::{BlockingTimer, Dispatcher, InlineDispatcher, Task, Timer};
pub use error::{ConfigError, Error};
pub use io::{Callback, IO, Value};

#[cfg(feature = "rayon")]
pub use pool::ThreadPool;
#[cfg(feature = "tokio")]
pub use pool::TokioTimer;
