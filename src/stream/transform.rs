//! Stream combinators.
//!
//! Every combinator returns a new stream in constant time. Positional
//! combinators (`take`, `drop`, `map`, `append`) never run element effects;
//! value-dependent ones (`filter`, `flat_map`, `take_while`, `drop_while`)
//! run an element only when the result is traversed up to it.

use std::sync::Arc;

use super::shape::{Repr, Stream};
use crate::effect::{IO, Value};

type Mapper<T, U> = Arc<dyn Fn(T) -> U + Send + Sync>;
type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

impl<T: Value> Stream<T> {
    /// This stream followed by `other`.
    pub fn append(&self, other: Self) -> Self {
        if other.is_nil() {
            return self.clone();
        }
        if self.is_nil() {
            return other;
        }
        Self::defer(self.collect_right(IO::pure(other), |element, rest| {
            IO::pure(Self::cons(element, Self::defer(rest)))
        }))
    }

    /// This stream repeated forever.
    ///
    /// The empty stream repeats to itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let cycle = Stream::of([1, 2]).repeat().take(5);
    /// assert_eq!(cycle.to_vec().run().unwrap(), vec![1, 2, 1, 2, 1]);
    /// ```
    pub fn repeat(&self) -> Self {
        if self.is_nil() {
            return Self::nil();
        }
        let again = self.clone();
        self.append(Self::lazy(move || again.repeat()))
    }

    /// The first `count` elements.
    ///
    /// No element effect is run; `take(0)` is the empty stream.
    pub fn take(&self, count: usize) -> Self {
        if count == 0 {
            return Self::nil();
        }
        match &self.repr {
            Repr::Nil => Self::nil(),
            Repr::Cons(cell) => Self::cons(
                cell.head.clone(),
                cell.tail.lazy_transform(move |tail| tail.take(count - 1)),
            ),
            Repr::Defer(next) => Self::defer(next.clone().map(move |stream| stream.take(count))),
        }
    }

    /// All but the first `count` elements.
    ///
    /// Skipped element effects are never run; `drop(0)` is this stream.
    pub fn drop(&self, count: usize) -> Self {
        if count == 0 {
            return self.clone();
        }
        match &self.repr {
            Repr::Nil => Self::nil(),
            Repr::Cons(cell) => cell.tail.lazy_transform(move |tail| tail.drop(count - 1)),
            Repr::Defer(next) => Self::defer(next.clone().map(move |stream| stream.drop(count))),
        }
    }

    /// The stream of at most the first element.
    pub fn head(&self) -> Self {
        self.take(1)
    }

    /// The stream without its first element.
    pub fn tail(&self) -> Self {
        self.drop(1)
    }

    /// The longest prefix whose elements satisfy `predicate`.
    ///
    /// With `include_failure`, the first element that fails the predicate is
    /// kept as the last element of the result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let stream = Stream::of([1, 2, 5, 1]);
    /// assert_eq!(stream.take_while(|x| *x < 3, false).to_vec().run().unwrap(), vec![1, 2]);
    /// assert_eq!(stream.take_while(|x| *x < 3, true).to_vec().run().unwrap(), vec![1, 2, 5]);
    /// ```
    pub fn take_while<P>(&self, predicate: P, include_failure: bool) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.take_while_with(Arc::new(predicate), include_failure)
    }

    fn take_while_with(&self, predicate: Predicate<T>, include_failure: bool) -> Self {
        match &self.repr {
            Repr::Nil => Self::nil(),
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                Self::defer(cell.head.clone().map(move |head| {
                    if predicate(&head) {
                        Self::cons_value(
                            head,
                            tail.take_while_with(Arc::clone(&predicate), include_failure),
                        )
                    } else if include_failure {
                        Self::cons_value(head, Self::nil())
                    } else {
                        Self::nil()
                    }
                }))
            }
            Repr::Defer(next) => Self::defer(next.clone().map(move |stream| {
                stream.take_while_with(Arc::clone(&predicate), include_failure)
            })),
        }
    }

    /// This stream from the first element that fails `predicate` on.
    ///
    /// That element's effect has already run by then, so the result starts
    /// with its value instead of running the effect again.
    pub fn drop_while<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.drop_while_with(Arc::new(predicate))
    }

    fn drop_while_with(&self, predicate: Predicate<T>) -> Self {
        match &self.repr {
            Repr::Nil => Self::nil(),
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                Self::defer(cell.head.clone().map(move |head| {
                    if predicate(&head) {
                        tail.drop_while_with(Arc::clone(&predicate))
                    } else {
                        Self::cons_value(head, tail.clone())
                    }
                }))
            }
            Repr::Defer(next) => Self::defer(
                next.clone()
                    .map(move |stream| stream.drop_while_with(Arc::clone(&predicate))),
            ),
        }
    }

    /// Only the elements that satisfy `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_with(Arc::new(predicate))
    }

    fn filter_with(&self, predicate: Predicate<T>) -> Self {
        match &self.repr {
            Repr::Nil => Self::nil(),
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                Self::defer(cell.head.clone().map(move |head| {
                    let rest = tail.filter_with(Arc::clone(&predicate));
                    if predicate(&head) {
                        Self::cons_value(head, rest)
                    } else {
                        rest
                    }
                }))
            }
            Repr::Defer(next) => Self::defer(
                next.clone()
                    .map(move |stream| stream.filter_with(Arc::clone(&predicate))),
            ),
        }
    }

    /// Applies `function` to every element.
    ///
    /// Elements are transformed when traversed; `map` itself runs nothing.
    pub fn map<U, F>(&self, function: F) -> Stream<U>
    where
        U: Value,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_with(Arc::new(function))
    }

    fn map_with<U: Value>(&self, function: Mapper<T, U>) -> Stream<U> {
        match &self.repr {
            Repr::Nil => Stream::nil(),
            Repr::Cons(cell) => {
                let apply = Arc::clone(&function);
                Stream::cons(
                    cell.head.clone().map(move |head| apply(head)),
                    cell.tail
                        .lazy_transform(move |tail| tail.map_with(Arc::clone(&function))),
                )
            }
            Repr::Defer(next) => Stream::defer(
                next.clone()
                    .map(move |stream| stream.map_with(Arc::clone(&function))),
            ),
        }
    }

    /// Replaces every element with the result of an effect built from it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    /// use effstream::stream::Stream;
    ///
    /// let lengths = Stream::of(["a", "bb"]).map_eval(|word| IO::delay(move || word.len()));
    /// assert_eq!(lengths.to_vec().run().unwrap(), vec![1, 2]);
    /// ```
    pub fn map_eval<U, F>(&self, function: F) -> Stream<U>
    where
        U: Value,
        F: Fn(T) -> IO<U> + Send + Sync + 'static,
    {
        self.map_eval_with(Arc::new(function))
    }

    fn map_eval_with<U: Value>(&self, function: Mapper<T, IO<U>>) -> Stream<U> {
        match &self.repr {
            Repr::Nil => Stream::nil(),
            Repr::Cons(cell) => {
                let apply = Arc::clone(&function);
                Stream::cons(
                    cell.head.clone().flat_map(move |head| apply(head)),
                    cell.tail
                        .lazy_transform(move |tail| tail.map_eval_with(Arc::clone(&function))),
                )
            }
            Repr::Defer(next) => Stream::defer(
                next.clone()
                    .map(move |stream| stream.map_eval_with(Arc::clone(&function))),
            ),
        }
    }

    /// Runs `effect` after each element, replacing the element with its result.
    pub fn chain<U: Value>(&self, effect: IO<U>) -> Stream<U> {
        self.map_eval(move |_| effect.clone())
    }

    /// Replaces every element with a stream and concatenates the results.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::stream::Stream;
    ///
    /// let pairs = Stream::of([1, 10]).flat_map(|x| Stream::of([x, x + 1]));
    /// assert_eq!(pairs.to_vec().run().unwrap(), vec![1, 2, 10, 11]);
    /// ```
    pub fn flat_map<U, F>(&self, function: F) -> Stream<U>
    where
        U: Value,
        F: Fn(T) -> Stream<U> + Send + Sync + 'static,
    {
        self.flat_map_with(Arc::new(function))
    }

    fn flat_map_with<U: Value>(&self, function: Mapper<T, Stream<U>>) -> Stream<U> {
        match &self.repr {
            Repr::Nil => Stream::nil(),
            Repr::Cons(cell) => {
                let tail = cell.tail.clone();
                Stream::defer(cell.head.clone().map(move |head| {
                    function(head).append(tail.flat_map_with(Arc::clone(&function)))
                }))
            }
            Repr::Defer(next) => Stream::defer(
                next.clone()
                    .map(move |stream| stream.flat_map_with(Arc::clone(&function))),
            ),
        }
    }

    /// The elements in reverse order.
    ///
    /// Reversing has to reach the end of the stream, so it never terminates
    /// on an infinite stream. Deferred structure is expanded when the result
    /// is first traversed; the elements themselves stay unrun and the result
    /// is a flat list of their effects.
    pub fn reverse(&self) -> Self {
        Self::defer(self.element_effects().map(|effects| {
            effects
                .into_iter()
                .fold(Self::nil(), |reversed, effect| Self::cons(effect, reversed))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collect<T: Value>(stream: &Stream<T>) -> Vec<T> {
        stream.to_vec().run().unwrap()
    }

    #[rstest]
    fn test_append() {
        let joined = Stream::of([1, 2]).append(Stream::of([3]));
        assert_eq!(collect(&joined), vec![1, 2, 3]);
        assert_eq!(collect(&Stream::nil().append(Stream::of([4]))), vec![4]);
        assert_eq!(collect(&Stream::of([5]).append(Stream::nil())), vec![5]);
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![1])]
    #[case(3, vec![1, 2, 3])]
    #[case(9, vec![1, 2, 3])]
    fn test_take(#[case] count: usize, #[case] expected: Vec<i32>) {
        assert_eq!(collect(&Stream::of([1, 2, 3]).take(count)), expected);
    }

    #[rstest]
    #[case(0, vec![1, 2, 3])]
    #[case(1, vec![2, 3])]
    #[case(3, vec![])]
    #[case(9, vec![])]
    fn test_drop(#[case] count: usize, #[case] expected: Vec<i32>) {
        assert_eq!(collect(&Stream::of([1, 2, 3]).drop(count)), expected);
    }

    #[rstest]
    fn test_take_does_not_run_skipped_heads() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let expensive = IO::delay(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        });
        let stream = Stream::eval([IO::pure(1), expensive, IO::pure(3)]);
        assert_eq!(collect(&stream.drop(2)), vec![3]);
        assert_eq!(collect(&stream.take(1)), vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_filter_and_map() {
        let stream = Stream::of(1..=6).filter(|x| x % 3 == 0).map(|x| x.to_string());
        assert_eq!(collect(&stream), vec!["3".to_string(), "6".to_string()]);
    }

    #[rstest]
    fn test_drop_while_keeps_first_failure() {
        let stream = Stream::of([1, 2, 7, 1]).drop_while(|x| *x < 5);
        assert_eq!(collect(&stream), vec![7, 1]);
    }

    #[rstest]
    fn test_reverse() {
        assert_eq!(collect(&Stream::of(1..=4).reverse()), vec![4, 3, 2, 1]);
        assert!(collect(&Stream::<i32>::nil().reverse()).is_empty());
    }

    #[rstest]
    fn test_reverse_leaves_skipped_elements_unrun() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = |value: i32| {
            let runs = Arc::clone(&runs);
            IO::delay(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                value
            })
        };
        let stream = Stream::eval([counted(1), counted(2), counted(3)]);
        let reversed = stream.reverse().drop(2);
        assert_eq!(collect(&reversed), vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_reverse_through_deferred_tails() {
        let stream = Stream::unfold(0, |n| (n < 5).then_some((n, n + 1)));
        assert_eq!(collect(&stream.reverse()), vec![4, 3, 2, 1, 0]);
    }

    #[rstest]
    fn test_chain_runs_effect_per_element() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let tick = IO::delay(move || counter.fetch_add(1, Ordering::SeqCst));
        let stream = Stream::of(["a", "b", "c"]).chain(tick);
        assert_eq!(collect(&stream), vec![0, 1, 2]);
    }

    #[rstest]
    fn test_repeat_of_nil_is_nil() {
        assert!(Stream::<i32>::nil().repeat().is_nil());
    }
}
