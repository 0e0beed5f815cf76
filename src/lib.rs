//! # effstream
//!
//! A stack-safe effect runtime with lazy streams that can be combined
//! concurrently.
//!
//! ## Overview
//!
//! - **Effects** ([`effect::IO`]): deferred computations with a failure
//!   channel, evaluated by a trampoline so deep chains never overflow the
//!   stack
//! - **Completion cells** ([`effect::Completion`]): write-once results shared
//!   across threads
//! - **Concurrency** ([`effect::both`], [`effect::race`], [`effect::seq`],
//!   [`effect::sleep`]): parallel composition over a pluggable dispatcher
//! - **Streams** ([`stream::Stream`]): lazy, possibly infinite sequences of
//!   effects, with folds, combinators, `zip` and `merge`
//!
//! ## Feature Flags
//!
//! - `rayon` (default): [`effect::ThreadPool`], a rayon-backed dispatcher
//! - `tokio` (default): [`effect::TokioTimer`] and a dispatcher for tokio handles
//! - `serde`: `Serialize`/`Deserialize` for [`effect::RuntimeConfig`]
//! - `full`: all of the above
//!
//! ## Example
//!
//! ```rust
//! use effstream::prelude::*;
//!
//! let total = Stream::of(1..=10)
//!     .map_eval(|x| IO::delay(move || x * 2))
//!     .fold_left(0, |acc, x| acc + x);
//!
//! assert_eq!(total.run().unwrap(), 110);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use effstream::prelude::*;
/// ```
pub mod prelude {
    pub use crate::control::*;
    pub use crate::effect::*;
    pub use crate::stream::*;
}

pub mod control;
pub mod effect;
pub mod stream;
