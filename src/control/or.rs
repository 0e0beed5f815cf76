//! A tagged disjoint union of two values.
//!
//! `Or<L, R>` is what [`race`](crate::effect::race) reports: which side
//! finished first, paired with a pending effect for the other side.
//!
//! # Examples
//!
//! ```rust
//! use effstream::control::Or;
//!
//! let winner: Or<i32, String> = Or::Left(42);
//! assert!(winner.is_left());
//! assert_eq!(winner.map_left(|x| x * 2), Or::Left(84));
//! ```

use std::fmt;

/// A value that is either `Left(L)` or `Right(R)`.
///
/// Unlike `Result`, neither side carries a success/failure meaning: in a race
/// `Left` means "the first effect won" and `Right` means "the second effect
/// won".
///
/// # Examples
///
/// ```rust
/// use effstream::control::Or;
///
/// let value: Or<&str, i32> = Or::Right(7);
/// let described = value.fold(|text| text.len() as i32, |number| number + 1);
/// assert_eq!(described, 8);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Or<L, R> {
    /// The left alternative.
    Left(L),
    /// The right alternative.
    Right(R),
}

impl<L, R> Or<L, R> {
    /// Returns `true` if this is a `Left` value.
    #[inline]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` if this is a `Right` value.
    #[inline]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Converts into the left value, discarding a right one.
    #[inline]
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// Converts into the right value, discarding a left one.
    #[inline]
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Borrows the left value, if any.
    #[inline]
    pub const fn left_ref(&self) -> Option<&L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// Borrows the right value, if any.
    #[inline]
    pub const fn right_ref(&self) -> Option<&R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Applies `function` to a left value, leaving a right value untouched.
    #[inline]
    pub fn map_left<T, F>(self, function: F) -> Or<T, R>
    where
        F: FnOnce(L) -> T,
    {
        match self {
            Self::Left(value) => Or::Left(function(value)),
            Self::Right(value) => Or::Right(value),
        }
    }

    /// Applies `function` to a right value, leaving a left value untouched.
    #[inline]
    pub fn map_right<T, F>(self, function: F) -> Or<L, T>
    where
        F: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => Or::Left(value),
            Self::Right(value) => Or::Right(function(value)),
        }
    }

    /// Collapses both alternatives into a single value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::control::Or;
    ///
    /// let side = Or::<i32, i32>::Right(3).fold(|_| "left", |_| "right");
    /// assert_eq!(side, "right");
    /// ```
    #[inline]
    pub fn fold<T, F, G>(self, left_function: F, right_function: G) -> T
    where
        F: FnOnce(L) -> T,
        G: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => left_function(value),
            Self::Right(value) => right_function(value),
        }
    }

    /// Exchanges the two sides.
    #[inline]
    pub fn swap(self) -> Or<R, L> {
        match self {
            Self::Left(value) => Or::Right(value),
            Self::Right(value) => Or::Left(value),
        }
    }
}

impl<T> Or<T, T> {
    /// Extracts the value regardless of which side holds it.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Self::Left(value) | Self::Right(value) => value,
        }
    }
}

impl<A, B> Or<(A, B), (A, B)> {
    /// Forgets which side won a same-typed race.
    ///
    /// For the outcome of [`seq`](crate::effect::seq) this yields the winner's
    /// value together with the loser's pending effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::control::Or;
    ///
    /// let outcome: Or<(i32, &str), (i32, &str)> = Or::Right((2, "pending"));
    /// assert_eq!(outcome.flatten(), (2, "pending"));
    /// ```
    #[inline]
    pub fn flatten(self) -> (A, B) {
        self.into_inner()
    }
}

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for Or<L, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(value) => formatter.debug_tuple("Left").field(value).finish(),
            Self::Right(value) => formatter.debug_tuple("Right").field(value).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_or_left_construction() {
        let value: Or<i32, String> = Or::Left(42);
        assert!(value.is_left());
        assert!(!value.is_right());
        assert_eq!(value.left_ref(), Some(&42));
    }

    #[rstest]
    fn test_or_right_construction() {
        let value: Or<i32, String> = Or::Right("hello".to_string());
        assert!(value.is_right());
        assert_eq!(value.right(), Some("hello".to_string()));
    }

    #[rstest]
    fn test_or_swap() {
        let value: Or<i32, &str> = Or::Left(1);
        assert_eq!(value.swap(), Or::Right(1));
    }

    #[rstest]
    #[case(Or::Left((1, 'a')), (1, 'a'))]
    #[case(Or::Right((2, 'b')), (2, 'b'))]
    fn test_or_flatten(#[case] outcome: Or<(i32, char), (i32, char)>, #[case] expected: (i32, char)) {
        assert_eq!(outcome.flatten(), expected);
    }
}
