//! Process-wide default dispatcher and timer.
//!
//! Both are created lazily on first access from [`RuntimeConfig::from_env`]
//! and live for the rest of the process. Code that needs isolation (tests,
//! libraries embedding their own pools) should build a
//! [`ThreadPool`](super::ThreadPool) and [`TokioTimer`](super::TokioTimer)
//! explicitly instead.
//!
//! # Examples
//!
//! ```rust
//! use effstream::effect::{both, runtime, IO};
//!
//! let pair = both(&runtime::dispatcher(), IO::pure(1), IO::pure(2));
//! assert_eq!(pair.run().unwrap(), (1, 2));
//! ```

use std::sync::{Arc, LazyLock};

use super::config::RuntimeConfig;
use super::dispatcher::{Dispatcher, Timer};
use super::pool::{ThreadPool, TokioTimer};

// =============================================================================
// Global Runtime
// =============================================================================

static CONFIG: LazyLock<RuntimeConfig> = LazyLock::new(|| {
    RuntimeConfig::from_env().unwrap_or_else(|error| {
        tracing::warn!(%error, "ignoring invalid runtime environment; using defaults");
        RuntimeConfig::default()
    })
});

static GLOBAL_DISPATCHER: LazyLock<Arc<dyn Dispatcher>> = LazyLock::new(|| {
    Arc::new(ThreadPool::new(&CONFIG).expect("Failed to create global worker pool"))
});

static GLOBAL_TIMER: LazyLock<Arc<dyn Timer>> = LazyLock::new(|| {
    Arc::new(TokioTimer::new(&CONFIG).expect("Failed to create global timer runtime"))
});

/// The configuration the global runtime was (or will be) built from.
#[inline]
pub fn config() -> &'static RuntimeConfig {
    &CONFIG
}

/// A handle to the global worker pool.
///
/// # Panics
///
/// Panics on first use if the operating system refuses to start the threads.
#[inline]
pub fn dispatcher() -> Arc<dyn Dispatcher> {
    Arc::clone(&GLOBAL_DISPATCHER)
}

/// A handle to the global timer.
///
/// # Panics
///
/// Panics on first use if the timer runtime cannot start.
#[inline]
pub fn timer() -> Arc<dyn Timer> {
    Arc::clone(&GLOBAL_TIMER)
}
