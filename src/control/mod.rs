//! Control structures shared by the effect and stream layers.
//!
//! - [`Or`]: the disjoint union reported by races
//! - `reclaim`: iterative drop for deeply nested effect and stream values
//!
//! # Examples
//!
//! ```rust
//! use effstream::control::Or;
//!
//! let outcome: Or<i32, i32> = Or::Left(1);
//! assert_eq!(outcome.into_inner(), 1);
//! ```

mod or;
pub(crate) mod reclaim;

pub use or::Or;
