//! Configuration for the stock dispatcher and timer.
//!
//! # Examples
//!
//! ```rust
//! use effstream::effect::RuntimeConfig;
//!
//! let config = RuntimeConfig::default()
//!     .with_worker_threads(4)
//!     .with_thread_name_prefix("ingest");
//! assert!(config.validate().is_ok());
//! assert_eq!(config.worker_threads, 4);
//! ```

use std::env;

use super::error::ConfigError;

/// Environment variable overriding [`RuntimeConfig::worker_threads`].
pub const WORKER_THREADS_VARIABLE: &str = "EFFSTREAM_WORKER_THREADS";
/// Environment variable overriding [`RuntimeConfig::timer_threads`].
pub const TIMER_THREADS_VARIABLE: &str = "EFFSTREAM_TIMER_THREADS";
/// Environment variable overriding [`RuntimeConfig::thread_name_prefix`].
pub const THREAD_NAME_VARIABLE: &str = "EFFSTREAM_THREAD_NAME";

const DEFAULT_THREAD_NAME_PREFIX: &str = "effstream-worker";

/// Sizing and naming of the worker pool and timer threads.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Threads in the worker pool that runs dispatched effects.
    pub worker_threads: usize,
    /// Prefix for worker thread names; threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
    /// Threads driving timers.
    pub timer_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            timer_threads: 1,
        }
    }
}

#[cfg(any(feature = "rayon", feature = "tokio"))]
fn default_worker_threads() -> usize {
    num_cpus::get()
}

#[cfg(not(any(feature = "rayon", feature = "tokio")))]
fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

impl RuntimeConfig {
    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Sets the number of timer threads.
    #[must_use]
    pub fn with_timer_threads(mut self, timer_threads: usize) -> Self {
        self.timer_threads = timer_threads;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Checks that every thread count is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroThreads`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                field: "worker_threads",
            });
        }
        if self.timer_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                field: "timer_threads",
            });
        }
        Ok(())
    }

    /// Defaults overridden by `EFFSTREAM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVariable`] if a thread count does not
    /// parse, or [`ConfigError::ZeroThreads`] if the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(WORKER_THREADS_VARIABLE) {
            config.worker_threads = parse_count(WORKER_THREADS_VARIABLE, &raw)?;
        }
        if let Some(raw) = lookup(TIMER_THREADS_VARIABLE) {
            config.timer_threads = parse_count(TIMER_THREADS_VARIABLE, &raw)?;
        }
        if let Some(prefix) = lookup(THREAD_NAME_VARIABLE) {
            config.thread_name_prefix = prefix;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_count(variable: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVariable {
            variable,
            value: raw.to_string(),
        })
}
