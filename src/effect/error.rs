//! Error types for the effect system.
//!
//! Every failure that travels through an [`IO`](super::IO) is an [`Error`]:
//! explicit ones built with [`IO::raise_error`](super::IO::raise_error),
//! errors returned by fallible thunks, and panics captured while running
//! thunks, continuations or handlers. `Error` is a cheap handle (`Arc`) so the
//! same failure can be handed to every reader of a completion cell, and
//! identity survives the trip to the `run` boundary.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// The failure channel of an effect.
///
/// # Examples
///
/// ```rust
/// use effstream::effect::{Error, IO};
///
/// let error = Error::msg("boom");
/// let outcome = IO::<i32>::raise_error(error.clone()).run();
/// assert!(outcome.unwrap_err().ptr_eq(&error));
/// ```
#[derive(Clone, thiserror::Error)]
pub enum Error {
    /// An error value raised explicitly or returned by a fallible thunk.
    #[error("{0}")]
    Raised(Arc<dyn StdError + Send + Sync>),

    /// A panic captured while evaluating a thunk, continuation or handler.
    #[error("effect panicked: {message}")]
    Panicked {
        /// The panic payload rendered as text.
        message: Arc<str>,
    },

    /// An ad-hoc error carrying only a message.
    #[error("{0}")]
    Message(Arc<str>),
}

impl Error {
    /// Wraps an arbitrary error value.
    ///
    /// Wrapping an `Error` returns it unchanged, so identity is preserved.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(error);
        match boxed.downcast::<Self>() {
            Ok(already) => *already,
            Err(other) => Self::Raised(Arc::from(other)),
        }
    }

    /// Creates an error that only carries a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(Arc::from(message.into()))
    }

    /// Converts a panic payload captured with `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked {
            message: Arc::from(message),
        }
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Raised(inner) => inner.downcast_ref::<E>(),
            Self::Panicked { .. } | Self::Message(_) => None,
        }
    }

    /// Returns `true` if both handles refer to the same failure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Raised(left), Self::Raised(right)) => Arc::ptr_eq(left, right),
            (Self::Panicked { message: left }, Self::Panicked { message: right })
            | (Self::Message(left), Self::Message(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Returns `true` if this error is a captured panic.
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raised(inner) => formatter.debug_tuple("Raised").field(inner).finish(),
            Self::Panicked { message } => formatter
                .debug_struct("Panicked")
                .field("message", message)
                .finish(),
            Self::Message(message) => formatter.debug_tuple("Message").field(message).finish(),
        }
    }
}

/// Errors raised while building a runtime from a [`RuntimeConfig`](super::RuntimeConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A thread count was set to zero.
    #[error("{field} must be greater than 0")]
    ZeroThreads {
        /// The offending setting.
        field: &'static str,
    },

    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {variable}")]
    InvalidVariable {
        /// The environment variable name.
        variable: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// The underlying thread pool refused to start.
    #[error("failed to build thread pool: {0}")]
    PoolBuild(String),
}
