//! Stock [`Dispatcher`] and [`Timer`] implementations.
//!
//! - [`ThreadPool`] (feature `rayon`): a fixed-size rayon pool
//! - [`TokioTimer`] (feature `tokio`): delays driven by a tokio runtime
//! - `tokio::runtime::Handle` (feature `tokio`) is also a dispatcher, running
//!   tasks on the runtime's blocking pool
//!
//! Dispatched tasks run effects to their next suspension point, which may
//! include blocking thunks, so neither implementation runs them on an async
//! executor thread.

#[cfg(feature = "rayon")]
pub use self::rayon_pool::ThreadPool;
#[cfg(feature = "tokio")]
pub use self::tokio_timer::TokioTimer;

#[cfg(feature = "rayon")]
mod rayon_pool {
    use std::fmt;

    use crate::effect::config::RuntimeConfig;
    use crate::effect::dispatcher::{Dispatcher, Task};
    use crate::effect::error::ConfigError;

    /// A fixed-size worker pool backed by rayon.
    ///
    /// A panic escaping a task is logged and does not take the worker down.
    /// Effects capture their own panics, so this only happens for raw tasks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::{IO, RuntimeConfig, ThreadPool};
    ///
    /// let pool = ThreadPool::new(&RuntimeConfig::default().with_worker_threads(2)).unwrap();
    /// let cell = IO::pure(3).start(&pool);
    /// assert_eq!(cell.wait().unwrap(), 3);
    /// ```
    pub struct ThreadPool {
        inner: rayon::ThreadPool,
    }

    impl ThreadPool {
        /// Builds a pool sized and named by `config`.
        ///
        /// # Errors
        ///
        /// Returns [`ConfigError`] if `config` is invalid or rayon cannot
        /// start the threads.
        pub fn new(config: &RuntimeConfig) -> Result<Self, ConfigError> {
            config.validate()?;
            let prefix = config.thread_name_prefix.clone();
            let inner = rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .thread_name(move |index| format!("{prefix}-{index}"))
                .panic_handler(|payload| {
                    let message = crate::effect::error::Error::from_panic(payload);
                    tracing::error!(%message, "task panicked on worker thread");
                })
                .build()
                .map_err(|error| ConfigError::PoolBuild(error.to_string()))?;
            tracing::info!(
                worker_threads = config.worker_threads,
                prefix = %config.thread_name_prefix,
                "worker pool started"
            );
            Ok(Self { inner })
        }

        /// Number of worker threads.
        pub fn current_num_threads(&self) -> usize {
            self.inner.current_num_threads()
        }
    }

    impl Dispatcher for ThreadPool {
        fn dispatch(&self, task: Task) {
            tracing::trace!("dispatching task to worker pool");
            self.inner.spawn(task);
        }
    }

    impl fmt::Debug for ThreadPool {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter
                .debug_struct("ThreadPool")
                .field("threads", &self.inner.current_num_threads())
                .finish()
        }
    }
}

#[cfg(feature = "tokio")]
mod tokio_timer {
    use std::fmt;
    use std::time::Duration;

    use tokio::runtime::{Builder, Handle, Runtime};

    use crate::effect::config::RuntimeConfig;
    use crate::effect::dispatcher::{Dispatcher, Task, Timer};
    use crate::effect::error::ConfigError;

    /// A [`Timer`] backed by a tokio runtime.
    ///
    /// Expired tasks run on the runtime's blocking pool, so a resumed effect
    /// never stalls the timer driver.
    pub struct TokioTimer {
        handle: Handle,
        // `None` when borrowing a caller's runtime.
        owned: Option<Runtime>,
    }

    impl TokioTimer {
        /// Starts a dedicated runtime with `config.timer_threads` workers.
        ///
        /// # Errors
        ///
        /// Returns [`ConfigError`] if `config` is invalid or the runtime
        /// cannot start.
        pub fn new(config: &RuntimeConfig) -> Result<Self, ConfigError> {
            config.validate()?;
            let prefix = format!("{}-timer", config.thread_name_prefix);
            let runtime = Builder::new_multi_thread()
                .worker_threads(config.timer_threads)
                .thread_name(prefix)
                .enable_time()
                .build()
                .map_err(|error| ConfigError::PoolBuild(error.to_string()))?;
            tracing::info!(timer_threads = config.timer_threads, "timer runtime started");
            Ok(Self {
                handle: runtime.handle().clone(),
                owned: Some(runtime),
            })
        }

        /// Uses an existing runtime, which must have the time driver enabled.
        pub fn from_handle(handle: Handle) -> Self {
            Self {
                handle,
                owned: None,
            }
        }
    }

    impl Timer for TokioTimer {
        fn schedule(&self, delay: Duration, task: Task) {
            let handle = self.handle.clone();
            self.handle.spawn(async move {
                tokio::time::sleep(delay).await;
                handle.spawn_blocking(task);
            });
        }
    }

    impl Dispatcher for Handle {
        fn dispatch(&self, task: Task) {
            self.spawn_blocking(task);
        }
    }

    impl fmt::Debug for TokioTimer {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter
                .debug_struct("TokioTimer")
                .field("owns_runtime", &self.owned.is_some())
                .finish()
        }
    }

    impl Drop for TokioTimer {
        fn drop(&mut self) {
            // The last handle may be released on one of the runtime's own
            // threads, where a blocking shutdown would wait on itself.
            if let Some(runtime) = self.owned.take() {
                runtime.shutdown_background();
            }
        }
    }
}
