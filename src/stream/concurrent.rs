//! Stream operations that evaluate two streams concurrently.

use std::sync::Arc;
use std::time::Duration;

use super::shape::Stream;
use crate::control::Or;
use crate::effect::{Completion, Dispatcher, IO, Timer, Value, both, race_completions, sleep};

type Zipper<A, B, T> = Arc<dyn Fn(A, B) -> T + Send + Sync>;

impl<T: Value> Stream<T> {
    /// Combines two streams element-wise, evaluating each pair of elements
    /// concurrently on `dispatcher`.
    ///
    /// The result ends as soon as either input ends.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::{Dispatcher, InlineDispatcher};
    /// use effstream::stream::Stream;
    /// use std::sync::Arc;
    ///
    /// let dispatcher: Arc<dyn Dispatcher> = Arc::new(InlineDispatcher);
    /// let sums = Stream::zip_with(&dispatcher, Stream::of([1, 2, 3]), Stream::of([10, 20]), |a, b| a + b);
    /// assert_eq!(sums.to_vec().run().unwrap(), vec![11, 22]);
    /// ```
    pub fn zip_with<A, B, F>(
        dispatcher: &Arc<dyn Dispatcher>,
        first: Stream<A>,
        second: Stream<B>,
        combine: F,
    ) -> Self
    where
        A: Value,
        B: Value,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        zip_from(Arc::clone(dispatcher), first, second, Arc::new(combine))
    }

    /// Interleaves two streams in the order their elements become available.
    ///
    /// Each round races the next element of both sides on `dispatcher`; the
    /// element that finishes first is emitted, and the other side's running
    /// pull is carried into the next round as is, so it is neither run again
    /// nor wrapped once per round it loses.
    /// The result ends when both inputs have ended.
    pub fn merge(dispatcher: &Arc<dyn Dispatcher>, first: Self, second: Self) -> Self {
        merge_from(Arc::clone(dispatcher), Side::Idle(first), Side::Idle(second))
    }
}

impl<A: Value, B: Value> Stream<(A, B)> {
    /// Pairs up the elements of two streams, evaluating each pair concurrently.
    pub fn zip(dispatcher: &Arc<dyn Dispatcher>, first: Stream<A>, second: Stream<B>) -> Self {
        Self::zip_with(dispatcher, first, second, |a, b| (a, b))
    }
}

impl Stream<()> {
    /// An infinite stream that emits `()` every `period`.
    pub fn awake_every(timer: &Arc<dyn Timer>, period: Duration) -> Self {
        Self::eval([sleep(timer, period)]).repeat()
    }
}

fn zip_from<A, B, T>(
    dispatcher: Arc<dyn Dispatcher>,
    first: Stream<A>,
    second: Stream<B>,
    combine: Zipper<A, B, T>,
) -> Stream<T>
where
    A: Value,
    B: Value,
    T: Value,
{
    let fronts = both(&dispatcher, first.uncons(), second.uncons());
    Stream::defer(fronts.map(move |fronts| match fronts {
        (Some((left_head, left_tail)), Some((right_head, right_tail))) => {
            let dispatcher = Arc::clone(&dispatcher);
            let combine = Arc::clone(&combine);
            let pair = both(&dispatcher, left_head, right_head);
            Stream::defer(pair.map(move |(left, right)| {
                Stream::cons_value(
                    combine(left, right),
                    zip_from(
                        Arc::clone(&dispatcher),
                        left_tail.clone(),
                        right_tail.clone(),
                        Arc::clone(&combine),
                    ),
                )
            }))
        }
        _ => Stream::nil(),
    }))
}

/// An element pulled from one side of a merge, with the rest of that side.
type Pulled<T> = Option<(T, Stream<T>)>;

/// One input of a merge between rounds.
#[derive(Clone)]
enum Side<T: Value> {
    /// Not pulled yet; the next round starts a pull.
    Idle(Stream<T>),
    /// Lost an earlier round; its pull is still running.
    Pulling(Completion<Pulled<T>>),
}

impl<T: Value> Side<T> {
    fn is_nil(&self) -> bool {
        matches!(self, Self::Idle(stream) if stream.is_nil())
    }

    fn launch(&self, dispatcher: &dyn Dispatcher) -> Completion<Pulled<T>> {
        match self {
            Self::Idle(stream) => stream.pull().start(dispatcher),
            Self::Pulling(pull) => pull.clone(),
        }
    }

    fn into_stream(self) -> Stream<T> {
        match self {
            Self::Idle(stream) => stream,
            Self::Pulling(pull) => resume(pull.to_io()),
        }
    }
}

fn merge_from<T: Value>(dispatcher: Arc<dyn Dispatcher>, first: Side<T>, second: Side<T>) -> Stream<T> {
    if first.is_nil() {
        return second.into_stream();
    }
    if second.is_nil() {
        return first.into_stream();
    }
    let round = {
        let dispatcher = Arc::clone(&dispatcher);
        IO::suspend(move || {
            let left = first.launch(dispatcher.as_ref());
            let right = second.launch(dispatcher.as_ref());
            race_completions(&left, &right)
        })
    };
    Stream::defer(round.map(move |outcome| {
        let (pulled, pending) = match outcome {
            Or::Left((pulled, pending)) | Or::Right((pending, pulled)) => (pulled, pending),
        };
        match pulled {
            Some((value, rest)) => Stream::cons_value(
                value,
                merge_from(
                    Arc::clone(&dispatcher),
                    Side::Idle(rest),
                    Side::Pulling(pending),
                ),
            ),
            None => Side::Pulling(pending).into_stream(),
        }
    }))
}

/// Turns an in-flight `pull` back into a stream.
fn resume<T: Value>(pending: IO<Pulled<T>>) -> Stream<T> {
    Stream::defer(pending.map(|pulled| match pulled {
        Some((value, rest)) => Stream::cons_value(value, rest),
        None => Stream::nil(),
    }))
}
