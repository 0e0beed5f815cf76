//! IO - a description of a deferred, possibly failing computation.
//!
//! `IO<A>` is a tree of instructions: pure values, deferred thunks, errors,
//! recovery scopes, sequential binds and asynchronous suspension points.
//! Building the tree performs no work; evaluation happens only in the
//! [interpreter](super::interpreter) when `run` (or one of its siblings) is
//! called.
//!
//! # Design Philosophy
//!
//! IO "describes" side effects but doesn't "execute" them. Every node is
//! immutable and shared through an `Arc`, so an `IO` can be cloned, stored in a
//! [`Stream`](crate::stream::Stream), sent to another thread and run again.
//! Each run re-evaluates the thunks it reaches, exactly once per node.
//!
//! # Examples
//!
//! ```rust
//! use effstream::effect::IO;
//!
//! let io = IO::pure(10)
//!     .map(|x| x * 2)
//!     .flat_map(|x| IO::pure(x + 1));
//! assert_eq!(io.run().unwrap(), 21);
//! ```
//!
//! # Side Effect Deferral
//!
//! ```rust
//! use effstream::effect::IO;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let executed = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&executed);
//!
//! let io = IO::delay(move || {
//!     flag.store(true, Ordering::SeqCst);
//!     42
//! });
//! assert!(!executed.load(Ordering::SeqCst));
//!
//! assert_eq!(io.run().unwrap(), 42);
//! assert!(executed.load(Ordering::SeqCst));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use super::completion::Completion;
use super::dispatcher::Dispatcher;
use super::error::Error;
use super::interpreter::{self, Erase, Erased, Outcome, Program, Sink, Step};
use crate::control::reclaim::reclaim;

/// Types that can flow through effects and streams.
///
/// Effects are re-runnable and may complete on another thread, so values must
/// be clonable, thread-safe and owned.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// One-shot receiver of an asynchronous outcome.
pub type Callback<A> = Box<dyn FnOnce(Result<A, Error>) + Send>;

type DelayThunk<A> = Arc<dyn Fn() -> Result<A, Error> + Send + Sync>;
type SuspendThunk<A> = Arc<dyn Fn() -> IO<A> + Send + Sync>;
type Handler<A> = Arc<dyn Fn(&Error) -> Option<IO<A>> + Send + Sync>;
type Register<A> = Arc<dyn Fn(Callback<A>) + Send + Sync>;

/// A deferred computation producing `A` or failing with [`Error`].
///
/// # Monad Laws
///
/// `IO` satisfies the monad laws up to observable results:
///
/// 1. **Left Identity**: `IO::pure(a).flat_map(f) == f(a)`
/// 2. **Right Identity**: `m.flat_map(IO::pure) == m`
/// 3. **Associativity**: `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
///
/// # Stack Safety
///
/// `run` walks the tree with an explicit frame stack, so chains of
/// hundreds of thousands of `flat_map`s evaluate in constant call-stack
/// depth. Recursive producers should put their recursive step behind
/// [`IO::suspend`] so that the tree itself is built on demand.
pub struct IO<A: Value> {
    node: Arc<Node<A>>,
}

enum Node<A: Value> {
    Pure(A),
    Delay(DelayThunk<A>),
    Suspend(SuspendThunk<A>),
    RaiseError(Error),
    Recover(RecoverNode<A>),
    Bind(Box<dyn Bound<A>>),
    Async(Register<A>),
}

/// A bind whose source type has been hidden.
trait Bound<A: Value>: Send + Sync {
    fn step(&self) -> Step;
}

struct BindNode<S: Value, A: Value> {
    // `None` only while the node is being dropped.
    source: Option<IO<S>>,
    continuation: Arc<dyn Fn(S) -> IO<A> + Send + Sync>,
}

impl<S: Value, A: Value> Bound<A> for BindNode<S, A> {
    fn step(&self) -> Step {
        let source = self
            .source
            .clone()
            .expect("IO internal error: bind source was reclaimed while reachable");
        let continuation = Arc::clone(&self.continuation);
        Step::Bind(
            Box::new(source),
            Box::new(move |value: Erased| {
                let value = *value
                    .downcast::<S>()
                    .expect("IO internal error: bind received a value of the wrong type");
                Box::new(continuation(value)) as Program
            }),
        )
    }
}

impl<S: Value, A: Value> Drop for BindNode<S, A> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            reclaim(source);
        }
    }
}

struct RecoverNode<A: Value> {
    // `None` only while the node is being dropped.
    source: Option<IO<A>>,
    handler: Handler<A>,
}

impl<A: Value> RecoverNode<A> {
    fn source(&self) -> &IO<A> {
        self.source
            .as_ref()
            .expect("IO internal error: recover source was reclaimed while reachable")
    }
}

impl<A: Value> Drop for RecoverNode<A> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            reclaim(source);
        }
    }
}

impl<A: Value> Clone for IO<A> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

static_assertions::assert_impl_all!(IO<i32>: Send, Sync, Clone);

impl<A: Value> IO<A> {
    fn from_node(node: Node<A>) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// Wraps an already computed value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// assert_eq!(IO::pure(42).run().unwrap(), 42);
    /// ```
    pub fn pure(value: A) -> Self {
        Self::from_node(Node::Pure(value))
    }

    /// Defers a side-effecting computation.
    ///
    /// The thunk runs each time the node is reached during a run. A panic
    /// inside it becomes an [`Error::Panicked`] on the failure channel.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// let io = IO::delay(|| 6 * 7);
    /// assert_eq!(io.run().unwrap(), 42);
    /// ```
    pub fn delay<F>(thunk: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::from_node(Node::Delay(Arc::new(move || Ok(thunk()))))
    }

    /// Defers a fallible computation; an `Err` is raised on the failure channel.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// let parsed = IO::attempt(|| "12".parse::<i32>());
    /// assert_eq!(parsed.run().unwrap(), 12);
    ///
    /// let broken = IO::attempt(|| "twelve".parse::<i32>());
    /// assert!(broken.run().is_err());
    /// ```
    pub fn attempt<E, F>(thunk: F) -> Self
    where
        E: StdError + Send + Sync + 'static,
        F: Fn() -> Result<A, E> + Send + Sync + 'static,
    {
        Self::from_node(Node::Delay(Arc::new(move || thunk().map_err(Error::new))))
    }

    /// Defers the construction of an effect.
    ///
    /// Use this at recursion points so the tree grows only as it is evaluated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// fn count_down(n: u64) -> IO<u64> {
    ///     if n == 0 {
    ///         IO::pure(0)
    ///     } else {
    ///         IO::suspend(move || count_down(n - 1))
    ///     }
    /// }
    ///
    /// assert_eq!(count_down(100_000).run().unwrap(), 0);
    /// ```
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        Self::from_node(Node::Suspend(Arc::new(thunk)))
    }

    /// A failed computation.
    pub fn raise_error(error: Error) -> Self {
        Self::from_node(Node::RaiseError(error))
    }

    /// Builds an effect that completes when `register` hands back an outcome.
    ///
    /// `register` receives a one-shot callback each time the effect is run.
    /// The run suspends until the callback fires, and resumes on whichever
    /// thread calls it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    /// use std::thread;
    ///
    /// let io = IO::from_callback(|callback| {
    ///     thread::spawn(move || callback(Ok(5)));
    /// });
    /// assert_eq!(io.run().unwrap(), 5);
    /// ```
    pub fn from_callback<F>(register: F) -> Self
    where
        F: Fn(Callback<A>) + Send + Sync + 'static,
    {
        Self::from_node(Node::Async(Arc::new(register)))
    }

    /// Chains a computation that depends on this one's result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// let io = IO::pure(10).flat_map(|x| IO::pure(x * 2));
    /// assert_eq!(io.run().unwrap(), 20);
    /// ```
    pub fn flat_map<B, F>(self, function: F) -> IO<B>
    where
        B: Value,
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
    {
        IO::from_node(Node::Bind(Box::new(BindNode {
            source: Some(self),
            continuation: Arc::new(function),
        })))
    }

    /// Alias for `flat_map`.
    #[inline]
    pub fn and_then<B, F>(self, function: F) -> IO<B>
    where
        B: Value,
        F: Fn(A) -> IO<B> + Send + Sync + 'static,
    {
        self.flat_map(function)
    }

    /// Transforms the result.
    ///
    /// Defined as `flat_map(|x| IO::pure(function(x)))`, so it shares its
    /// laziness and error behaviour with `flat_map`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// assert_eq!(IO::pure(21).map(|x| x * 2).run().unwrap(), 42);
    /// ```
    pub fn map<B, F>(self, function: F) -> IO<B>
    where
        B: Value,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.flat_map(move |value| IO::pure(function(value)))
    }

    /// Runs `next` after this effect, discarding this effect's result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::IO;
    ///
    /// let io = IO::pure("ignored").then(|| IO::pure(7));
    /// assert_eq!(io.run().unwrap(), 7);
    /// ```
    pub fn then<B, F>(self, next: F) -> IO<B>
    where
        B: Value,
        F: Fn() -> IO<B> + Send + Sync + 'static,
    {
        self.flat_map(move |_| next())
    }

    /// Runs both effects in order and combines their results.
    pub fn map2<B, C, F>(self, other: IO<B>, function: F) -> IO<C>
    where
        B: Value,
        C: Value,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        self.flat_map(move |a| {
            let function = Arc::clone(&function);
            other.clone().map(move |b| function(a.clone(), b))
        })
    }

    /// Runs both effects in order and pairs their results.
    pub fn product<B: Value>(self, other: IO<B>) -> IO<(A, B)> {
        self.map2(other, |a, b| (a, b))
    }

    /// Recovers from a failure with a replacement effect.
    ///
    /// The handler is consulted only if this effect fails. Returning `None`
    /// means "not handled here" and the error keeps propagating.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::{Error, IO};
    ///
    /// let io = IO::<i32>::raise_error(Error::msg("boom"))
    ///     .recover_with(|error| (error.to_string() == "boom").then(|| IO::pure(0)));
    /// assert_eq!(io.run().unwrap(), 0);
    /// ```
    pub fn recover_with<F>(self, handler: F) -> Self
    where
        F: Fn(&Error) -> Option<Self> + Send + Sync + 'static,
    {
        Self::from_node(Node::Recover(RecoverNode {
            source: Some(self),
            handler: Arc::new(handler),
        }))
    }

    /// Recovers from a failure with a replacement value.
    pub fn recover<F>(self, handler: F) -> Self
    where
        F: Fn(&Error) -> Option<A> + Send + Sync + 'static,
    {
        self.recover_with(move |error| handler(error).map(IO::pure))
    }

    /// Moves the failure channel into the result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effstream::effect::{Error, IO};
    ///
    /// let outcome = IO::<i32>::raise_error(Error::msg("nope")).attempt_result();
    /// assert!(outcome.run().unwrap().is_err());
    /// ```
    pub fn attempt_result(self) -> IO<Result<A, Error>> {
        self.map(Ok).recover(|error| Some(Err(error.clone())))
    }

    /// Runs the effect on the calling thread and blocks until it finishes.
    ///
    /// Asynchronous parts (joins, races, sleeps) may finish the run on other
    /// threads; the calling thread waits on a condition variable meanwhile.
    /// An unrecovered failure is returned unchanged.
    pub fn run(&self) -> Result<A, Error> {
        let completion = Completion::new();
        let writer = completion.clone();
        self.run_with(move |outcome| {
            writer.complete(outcome);
        });
        completion.wait()
    }

    /// Runs the effect and panics on an unrecovered failure.
    ///
    /// The panic payload is the [`Error`] itself.
    ///
    /// # Panics
    ///
    /// Panics if the effect fails.
    pub fn run_unsafe(&self) -> A {
        match self.run() {
            Ok(value) => value,
            Err(error) => std::panic::panic_any(error),
        }
    }

    /// Starts the effect on the calling thread and delivers its outcome to
    /// `callback` without blocking.
    ///
    /// The callback may be invoked before this returns or later from another
    /// thread.
    pub fn run_with<F>(&self, callback: F)
    where
        F: FnOnce(Result<A, Error>) + Send + 'static,
    {
        let sink: Sink = Box::new(move |outcome: Outcome| {
            callback(outcome.map(|value| {
                *value
                    .downcast::<A>()
                    .expect("IO internal error: run produced a value of the wrong type")
            }));
        });
        interpreter::execute(Box::new(self.clone()), sink);
    }

    /// Submits a run of this effect to `dispatcher`.
    ///
    /// The returned cell holds the outcome once the run finishes.
    pub fn start(&self, dispatcher: &dyn Dispatcher) -> Completion<A> {
        let completion = Completion::new();
        let writer = completion.clone();
        let io = self.clone();
        dispatcher.dispatch(Box::new(move || {
            io.run_with(move |outcome| {
                writer.complete(outcome);
            });
        }));
        completion
    }
}

impl IO<()> {
    /// The effect that does nothing and yields `()`.
    pub fn unit() -> Self {
        Self::pure(())
    }
}

impl<A: Value> Erase for IO<A> {
    fn step(&self) -> Step {
        match &*self.node {
            Node::Pure(value) => Step::Pure(Box::new(value.clone())),
            Node::Delay(thunk) => {
                let thunk = Arc::clone(thunk);
                Step::Delay(Box::new(move || {
                    thunk().map(|value| Box::new(value) as Erased)
                }))
            }
            Node::Suspend(thunk) => {
                let thunk = Arc::clone(thunk);
                Step::Suspend(Box::new(move || Box::new(thunk()) as Program))
            }
            Node::RaiseError(error) => Step::Raise(error.clone()),
            Node::Recover(recover) => {
                let handler = Arc::clone(&recover.handler);
                Step::Recover(
                    Box::new(recover.source().clone()),
                    Box::new(move |error: &Error| {
                        handler(error).map(|replacement| Box::new(replacement) as Program)
                    }),
                )
            }
            Node::Bind(bound) => bound.step(),
            Node::Async(register) => {
                let register = Arc::clone(register);
                Step::Async(Box::new(move |sink: Sink| {
                    register(Box::new(move |outcome: Result<A, Error>| {
                        sink(outcome.map(|value| Box::new(value) as Erased));
                    }));
                }))
            }
        }
    }
}

impl<A: Value + fmt::Debug> fmt::Debug for IO<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node {
            Node::Pure(value) => formatter.debug_tuple("Pure").field(value).finish(),
            Node::Delay(_) => formatter.debug_tuple("Delay").field(&"<thunk>").finish(),
            Node::Suspend(_) => formatter.debug_tuple("Suspend").field(&"<thunk>").finish(),
            Node::RaiseError(error) => formatter.debug_tuple("RaiseError").field(error).finish(),
            Node::Recover(recover) => formatter
                .debug_struct("Recover")
                .field("source", recover.source())
                .finish_non_exhaustive(),
            Node::Bind(_) => formatter.debug_tuple("Bind").field(&"<continuation>").finish(),
            Node::Async(_) => formatter.debug_tuple("Async").field(&"<register>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    fn test_io_pure() {
        assert_eq!(IO::pure(42).run().unwrap(), 42);
    }

    #[rstest]
    fn test_io_delay_runs_once_per_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let io = IO::delay(move || counter_clone.fetch_add(1, Ordering::SeqCst));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        io.run().unwrap();
        io.run().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_io_map_and_flat_map() {
        let io = IO::pure(10).map(|x| x + 1).flat_map(|x| IO::pure(x * 2));
        assert_eq!(io.run().unwrap(), 22);
    }

    #[rstest]
    fn test_io_product_is_sequential() {
        let io = IO::pure(1).product(IO::pure("one"));
        assert_eq!(io.run().unwrap(), (1, "one"));
    }

    #[rstest]
    fn test_io_debug_names_variant() {
        assert_eq!(format!("{:?}", IO::pure(1)), "Pure(1)");
        assert_eq!(format!("{:?}", IO::delay(|| 1)), "Delay(\"<thunk>\")");
    }

    #[rstest]
    fn test_io_run_unsafe_panics_with_error_payload() {
        let error = Error::msg("fatal");
        let io = IO::<i32>::raise_error(error.clone());
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| io.run_unsafe()))
            .unwrap_err();
        let surfaced = payload.downcast::<Error>().unwrap();
        assert!(surfaced.ptr_eq(&error));
    }
}
