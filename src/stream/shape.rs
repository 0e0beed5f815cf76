//! The stream representation and its constructors.

use std::fmt;
use std::sync::Arc;

use crate::control::reclaim::reclaim;
use crate::effect::{IO, Value};

/// A lazy, possibly infinite sequence of effectful elements.
///
/// A stream is one of three shapes:
///
/// - `Nil`: the empty stream
/// - `Cons`: an element effect followed by the rest of the stream
/// - `Defer`: an effect that produces the rest of the stream when run
///
/// Element effects are run only by traversals ([`fold_left`](Self::fold_left),
/// [`fold_right`](Self::fold_right), [`to_vec`](Self::to_vec), ...). Building
/// and transforming a stream never runs them, and `take`/`drop` never run the
/// heads they skip.
///
/// Streams are persistent: every operation returns a new stream and shares
/// structure with its input, and a stream can be traversed any number of
/// times.
///
/// # Examples
///
/// ```rust
/// use effstream::stream::Stream;
///
/// let evens = Stream::of(1..=10).filter(|x| x % 2 == 0).map(|x| x * 10);
/// assert_eq!(evens.to_vec().run().unwrap(), vec![20, 40, 60, 80, 100]);
/// ```
pub struct Stream<T: Value> {
    pub(crate) repr: Repr<T>,
}

pub(crate) enum Repr<T: Value> {
    Nil,
    Cons(Arc<ConsCell<T>>),
    Defer(IO<Stream<T>>),
}

pub(crate) struct ConsCell<T: Value> {
    pub(crate) head: IO<T>,
    pub(crate) tail: Stream<T>,
}

impl<T: Value> Drop for ConsCell<T> {
    fn drop(&mut self) {
        if !self.tail.is_nil() {
            reclaim(std::mem::replace(&mut self.tail, Stream::nil()));
        }
    }
}

impl<T: Value> Clone for Repr<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Nil => Self::Nil,
            Self::Cons(cell) => Self::Cons(Arc::clone(cell)),
            Self::Defer(next) => Self::Defer(next.clone()),
        }
    }
}

impl<T: Value> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            repr: self.repr.clone(),
        }
    }
}

static_assertions::assert_impl_all!(Stream<i32>: Send, Sync, Clone);

impl<T: Value> Default for Stream<T> {
    fn default() -> Self {
        Self::nil()
    }
}

impl<T: Value> Stream<T> {
    /// The empty stream.
    pub const fn nil() -> Self {
        Self { repr: Repr::Nil }
    }

    /// A stream whose first element is produced by `head`.
    pub fn cons(head: IO<T>, tail: Self) -> Self {
        Self {
            repr: Repr::Cons(Arc::new(ConsCell { head, tail })),
        }
    }

    /// A stream whose first element is the already computed `value`.
    pub fn cons_value(value: T, tail: Self) -> Self {
        Self::cons(IO::pure(value), tail)
    }

    /// A stream whose structure is produced by running `next`.
    pub fn defer(next: IO<Self>) -> Self {
        Self {
            repr: Repr::Defer(next),
        }
    }

    /// A stream built by calling `producer` when it is first traversed.
    ///
    /// The producer runs again on every traversal.
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        Self::defer(IO::delay(producer))
    }

    /// A finite stream of the given values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// assert_eq!(Stream::of(["a", "b"]).to_vec().run().unwrap(), vec!["a", "b"]);
    /// ```
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::eval(values.into_iter().map(IO::pure))
    }

    /// A finite stream whose elements are produced by the given effects.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    /// use effstream::stream::Stream;
    ///
    /// let stream = Stream::eval([IO::pure(1), IO::delay(|| 2)]);
    /// assert_eq!(stream.to_vec().run().unwrap(), vec![1, 2]);
    /// ```
    pub fn eval<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = IO<T>>,
    {
        let effects: Vec<IO<T>> = effects.into_iter().collect();
        effects
            .into_iter()
            .rev()
            .fold(Self::nil(), |tail, head| Self::cons(head, tail))
    }

    /// A stream generated from `seed` by repeatedly applying `step`.
    ///
    /// `step` returns the next element and state, or `None` to end the
    /// stream. Nothing runs until the stream is traversed, not even the first
    /// step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let powers = Stream::unfold(1_u32, |n| (n <= 100).then(|| (n, n * 2)));
    /// assert_eq!(powers.to_vec().run().unwrap(), vec![1, 2, 4, 8, 16, 32, 64]);
    /// ```
    pub fn unfold<S, F>(seed: S, step: F) -> Self
    where
        S: Value,
        F: Fn(S) -> Option<(T, S)> + Send + Sync + 'static,
    {
        let step: Arc<dyn Fn(S) -> Option<(T, S)> + Send + Sync> = Arc::new(step);
        Self::lazy(move || unfold_from(seed.clone(), Arc::clone(&step)))
    }

    /// A stream that calls `more` for each element until it returns `None`.
    ///
    /// Suited to pull-based sources such as readers and channels.
    pub fn iterate<F>(more: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self::unfold((), move |()| more().map(|value| (value, ())))
    }

    /// Returns `true` for the literal empty stream.
    ///
    /// A deferred stream that would turn out empty is not `nil` until run.
    pub const fn is_nil(&self) -> bool {
        matches!(self.repr, Repr::Nil)
    }

    /// Applies `transform` to this stream, delaying the call past the first
    /// element if the stream is a `Cons`.
    ///
    /// Recursive transformations use this on tails so that building the
    /// result of a transformation costs constant work per call.
    pub(crate) fn lazy_transform<U, F>(&self, transform: F) -> Stream<U>
    where
        U: Value,
        F: Fn(&Self) -> Stream<U> + Send + Sync + 'static,
    {
        match &self.repr {
            Repr::Cons(_) => {
                let stream = self.clone();
                Stream::lazy(move || transform(&stream))
            }
            Repr::Nil | Repr::Defer(_) => transform(self),
        }
    }
}

fn unfold_from<T, S>(state: S, step: Arc<dyn Fn(S) -> Option<(T, S)> + Send + Sync>) -> Stream<T>
where
    T: Value,
    S: Value,
{
    match step(state) {
        Some((value, next)) => Stream::cons_value(
            value,
            Stream::lazy(move || unfold_from(next.clone(), Arc::clone(&step))),
        ),
        None => Stream::nil(),
    }
}

impl<T: Value> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for Stream<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Nil => formatter.write_str("Nil"),
            Repr::Cons(cell) => formatter
                .debug_struct("Cons")
                .field("head", &cell.head)
                .finish_non_exhaustive(),
            Repr::Defer(_) => formatter.write_str("Defer(..)"),
        }
    }
}
