//! Lazy, effectful, persistent streams.
//!
//! A [`Stream`] is a possibly infinite sequence whose elements are produced by
//! [`IO`](crate::effect::IO) effects and whose structure can itself be
//! deferred behind an effect. Combinators build new streams without running
//! anything; traversals return an `IO` that, when run, walks the stream and
//! runs exactly the element effects it needs.
//!
//! # Examples
//!
//! Infinite streams are fine as long as the traversal is bounded:
//!
//! ```rust
//! use effstream::stream::Stream;
//!
//! let naturals = Stream::unfold(0_u64, |n| Some((n, n + 1)));
//! let squares = naturals.map(|n| n * n).filter(|n| n % 2 == 1).take(4);
//! assert_eq!(squares.to_vec().run().unwrap(), vec![1, 9, 25, 49]);
//! ```
//!
//! Effects run only when reached:
//!
//! ```rust
//! use effstream::effect::IO;
//! use effstream::stream::Stream;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let touched = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&touched);
//! let stream = Stream::eval([
//!     IO::pure(1),
//!     IO::delay(move || {
//!         flag.store(true, Ordering::SeqCst);
//!         2
//!     }),
//! ]);
//!
//! assert_eq!(stream.head().to_vec().run().unwrap(), vec![1]);
//! assert!(!touched.load(Ordering::SeqCst));
//! ```

mod concurrent;
mod fold;
mod shape;
mod transform;

pub use self::shape::Stream;
