//! Traversals: the only operations that run element effects.
//!
//! Every traversal returns an [`IO`]; nothing happens until that `IO` is run,
//! and each run traverses the stream afresh.

use std::sync::Arc;

use parking_lot::Mutex;

use super::shape::{Repr, Stream};
use crate::effect::{IO, Value};

type RightFold<T, R> = Arc<dyn Fn(T, IO<R>) -> IO<R> + Send + Sync>;
type RightCollect<T, R> = Arc<dyn Fn(IO<T>, IO<R>) -> IO<R> + Send + Sync>;
type LeftFold<T, R> = Arc<dyn Fn(R, T) -> R + Send + Sync>;
type LeftCollect<T, R> = Arc<dyn Fn(IO<R>, IO<T>) -> IO<R> + Send + Sync>;

impl<T: Value> Stream<T> {
    /// Folds from the right with an effectful combiner.
    ///
    /// The combiner receives each element and the *unevaluated* fold of the
    /// rest, so it can stop early by not running it. Elements are evaluated
    /// front to back, and only as far as the combiner asks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    /// use effstream::stream::Stream;
    ///
    /// let naturals = Stream::unfold(1, |n| Some((n, n + 1)));
    /// let first_big = naturals.fold_right(IO::pure(None), |x, rest| {
    ///     if x > 3 { IO::pure(Some(x)) } else { rest }
    /// });
    /// assert_eq!(first_big.run().unwrap(), Some(4));
    /// ```
    pub fn fold_right<R, F>(&self, zero: IO<R>, combine: F) -> IO<R>
    where
        R: Value,
        F: Fn(T, IO<R>) -> IO<R> + Send + Sync + 'static,
    {
        self.fold_right_with(zero, Arc::new(combine))
    }

    fn fold_right_with<R: Value>(&self, zero: IO<R>, combine: RightFold<T, R>) -> IO<R> {
        match &self.repr {
            Repr::Nil => zero,
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                cell.head.clone().flat_map(move |head| {
                    let rest = tail.fold_right_with(zero.clone(), Arc::clone(&combine));
                    combine(head, rest)
                })
            }
            Repr::Defer(next) => next
                .clone()
                .flat_map(move |stream| stream.fold_right_with(zero.clone(), Arc::clone(&combine))),
        }
    }

    /// Folds from the right with a pure combiner.
    ///
    /// Unlike [`fold_right`](Self::fold_right) this always traverses the
    /// whole stream.
    pub fn fold_right_value<R, F>(&self, zero: R, combine: F) -> IO<R>
    where
        R: Value,
        F: Fn(T, R) -> R + Send + Sync + 'static,
    {
        let combine = Arc::new(combine);
        self.fold_right(IO::pure(zero), move |element, rest| {
            let combine = Arc::clone(&combine);
            rest.map(move |accumulated| combine(element.clone(), accumulated))
        })
    }

    /// Folds from the right over the element *effects*.
    ///
    /// Neither the element nor the rest of the fold is run unless the
    /// combiner's result runs it.
    pub fn collect_right<R, F>(&self, zero: IO<R>, combine: F) -> IO<R>
    where
        R: Value,
        F: Fn(IO<T>, IO<R>) -> IO<R> + Send + Sync + 'static,
    {
        self.collect_right_with(zero, Arc::new(combine))
    }

    pub(crate) fn collect_right_with<R: Value>(
        &self,
        zero: IO<R>,
        combine: RightCollect<T, R>,
    ) -> IO<R> {
        match &self.repr {
            Repr::Nil => zero,
            Repr::Cons(cell) => {
                let head = cell.head.clone();
                let tail = cell.tail.clone();
                IO::suspend(move || {
                    let rest = tail.collect_right_with(zero.clone(), Arc::clone(&combine));
                    combine(head.clone(), rest)
                })
            }
            Repr::Defer(next) => next.clone().flat_map(move |stream| {
                stream.collect_right_with(zero.clone(), Arc::clone(&combine))
            }),
        }
    }

    /// Folds from the left, evaluating every element in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let sum = Stream::of(1..=100).fold_left(0, |acc, x| acc + x);
    /// assert_eq!(sum.run().unwrap(), 5050);
    /// ```
    pub fn fold_left<R, F>(&self, zero: R, combine: F) -> IO<R>
    where
        R: Value,
        F: Fn(R, T) -> R + Send + Sync + 'static,
    {
        self.fold_left_with(zero, Arc::new(combine))
    }

    fn fold_left_with<R: Value>(&self, zero: R, combine: LeftFold<T, R>) -> IO<R> {
        match &self.repr {
            Repr::Nil => IO::pure(zero),
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                cell.head.clone().flat_map(move |head| {
                    let accumulated = combine(zero.clone(), head);
                    tail.fold_left_with(accumulated, Arc::clone(&combine))
                })
            }
            Repr::Defer(next) => next
                .clone()
                .flat_map(move |stream| stream.fold_left_with(zero.clone(), Arc::clone(&combine))),
        }
    }

    /// Folds from the left over the element *effects*.
    ///
    /// The result is an effect that has not run any element yet; what it runs
    /// is up to the combiner.
    pub fn collect_left<R, F>(&self, zero: IO<R>, combine: F) -> IO<R>
    where
        R: Value,
        F: Fn(IO<R>, IO<T>) -> IO<R> + Send + Sync + 'static,
    {
        self.collect_left_with(zero, Arc::new(combine))
    }

    fn collect_left_with<R: Value>(&self, zero: IO<R>, combine: LeftCollect<T, R>) -> IO<R> {
        match &self.repr {
            Repr::Nil => zero,
            Repr::Cons(cell) => {
                let head = cell.head.clone();
                let tail = cell.tail.clone();
                IO::suspend(move || {
                    let step = {
                        let combine = Arc::clone(&combine);
                        let zero = zero.clone();
                        let head = head.clone();
                        IO::suspend(move || combine(zero.clone(), head.clone()))
                    };
                    tail.collect_left_with(step, Arc::clone(&combine))
                })
            }
            Repr::Defer(next) => next.clone().flat_map(move |stream| {
                stream.collect_left_with(zero.clone(), Arc::clone(&combine))
            }),
        }
    }

    /// Expands the whole structure and collects the element effects, unrun,
    /// in order.
    pub(crate) fn element_effects(&self) -> IO<Vec<IO<T>>> {
        let stream = self.clone();
        IO::suspend(move || {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let effects = Arc::clone(&buffer);
            stream
                .gather_effects(Arc::clone(&buffer))
                .map(move |()| std::mem::take(&mut *effects.lock()))
        })
    }

    fn gather_effects(&self, buffer: Arc<Mutex<Vec<IO<T>>>>) -> IO<()> {
        let stream = self.clone();
        IO::suspend(move || match &stream.repr {
            Repr::Nil => IO::unit(),
            Repr::Cons(cell) => {
                buffer.lock().push(cell.head.clone());
                cell.tail.gather_effects(Arc::clone(&buffer))
            }
            Repr::Defer(next) => {
                let buffer = Arc::clone(&buffer);
                next.clone()
                    .flat_map(move |rest| rest.gather_effects(Arc::clone(&buffer)))
            }
        })
    }

    /// The first element's value, or `None` for an empty stream.
    ///
    /// Runs only the first element effect.
    pub fn head_option(&self) -> IO<Option<T>> {
        match &self.repr {
            Repr::Nil => IO::pure(None),
            Repr::Cons(cell) => cell.head.clone().map(Some),
            Repr::Defer(next) => next.clone().flat_map(|stream| stream.head_option()),
        }
    }

    /// The first element's effect, without running it.
    pub fn lazy_head(&self) -> IO<Option<IO<T>>> {
        match &self.repr {
            Repr::Nil => IO::pure(None),
            Repr::Cons(cell) => IO::pure(Some(cell.head.clone())),
            Repr::Defer(next) => next.clone().flat_map(|stream| stream.lazy_head()),
        }
    }

    /// Splits off the first element's effect (unrun) and the rest of the
    /// stream, expanding deferred structure only once.
    pub fn uncons(&self) -> IO<Option<(IO<T>, Self)>> {
        match &self.repr {
            Repr::Nil => IO::pure(None),
            Repr::Cons(cell) => IO::pure(Some((cell.head.clone(), cell.tail.clone()))),
            Repr::Defer(next) => next.clone().flat_map(|stream| stream.uncons()),
        }
    }

    /// Runs the first element and splits it off from the rest of the stream.
    pub fn pull(&self) -> IO<Option<(T, Self)>> {
        self.uncons().flat_map(|split| match split {
            Some((head, tail)) => head.map(move |value| Some((value, tail.clone()))),
            None => IO::pure(None),
        })
    }

    /// Runs every element for its effects, discarding the values.
    pub fn drain(&self) -> IO<()> {
        self.fold_left((), |(), _| ())
    }

    /// Runs every element and collects the values in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let stream = Stream::of(1..=3).map(|x| x * x);
    /// assert_eq!(stream.to_vec().run().unwrap(), vec![1, 4, 9]);
    /// ```
    pub fn to_vec(&self) -> IO<Vec<T>> {
        let stream = self.clone();
        IO::suspend(move || {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&buffer);
            stream
                .fold_left((), move |(), element| sink.lock().push(element))
                .map(move |()| std::mem::take(&mut *buffer.lock()))
        })
    }

    /// `true` if some element satisfies `predicate`.
    ///
    /// Stops running elements at the first match.
    pub fn exists<P>(&self, predicate: P) -> IO<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.fold_right(IO::pure(false), move |element, rest| {
            if predicate(&element) {
                IO::pure(true)
            } else {
                rest
            }
        })
    }

    /// `true` if every element satisfies `predicate`.
    ///
    /// Stops running elements at the first counterexample.
    pub fn forall<P>(&self, predicate: P) -> IO<bool>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.fold_right(IO::pure(true), move |element, rest| {
            if predicate(&element) {
                rest
            } else {
                IO::pure(false)
            }
        })
    }
}
