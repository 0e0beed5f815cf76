//! The trampolined evaluator behind every `IO` run.
//!
//! Evaluation never recurses on the call stack. The loop keeps a control
//! register (an effect to evaluate, a value to return, or an error to
//! propagate) and an explicit stack of frames:
//!
//! - a bind frame holds a continuation waiting for a value
//! - a recover frame holds a handler waiting for an error
//!
//! A value pops frames until a bind continuation accepts it, skipping recover
//! frames. An error pops frames until a handler accepts it, skipping bind
//! frames. When the stack is empty the outcome goes to the run's sink.
//!
//! Typed nodes are erased into [`Step`]s one at a time, so the loop handles a
//! single frame type whatever the value types along the chain.
//!
//! # Asynchronous suspension
//!
//! On an async node the loop parks its fiber (frame stack plus sink) in a
//! [`Handoff`] and calls the node's register function with a callback. If the
//! callback fires before `register` returns, the loop picks the outcome up and
//! keeps going on the same thread. Otherwise the loop detaches and the
//! callback resumes the fiber on whatever thread delivers the outcome. A
//! single compare-and-swap decides which side resumes, so a fiber is never
//! resumed twice.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::error::Error;

/// A value whose type is known only to the node that produced it.
pub(crate) type Erased = Box<dyn Any + Send>;

/// The outcome of a (sub-)computation.
pub(crate) type Outcome = Result<Erased, Error>;

/// An effect viewed through its erased interface.
pub(crate) type Program = Box<dyn Erase>;

/// Receives the final outcome of a run.
pub(crate) type Sink = Box<dyn FnOnce(Outcome) + Send>;

pub(crate) type Continuation = Box<dyn FnOnce(Erased) -> Program + Send>;
pub(crate) type RecoverHandler = Box<dyn FnOnce(&Error) -> Option<Program> + Send>;

/// Erases one node of a typed effect.
pub(crate) trait Erase: Send {
    fn step(&self) -> Step;
}

/// A single instruction for the evaluation loop.
pub(crate) enum Step {
    Pure(Erased),
    Delay(Box<dyn FnOnce() -> Outcome + Send>),
    Suspend(Box<dyn FnOnce() -> Program + Send>),
    Raise(Error),
    Recover(Program, RecoverHandler),
    Bind(Program, Continuation),
    Async(Box<dyn FnOnce(Sink) + Send>),
}

/// Inline capacity of the frame stack before it spills to the heap.
const FRAME_INLINE_CAPACITY: usize = 16;

enum Frame {
    Bind(Continuation),
    Recover(RecoverHandler),
}

enum Control {
    Eval(Program),
    Value(Erased),
    Fail(Error),
}

impl Control {
    fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Ok(value) => Self::Value(value),
            Err(error) => Self::Fail(error),
        }
    }
}

/// The resumable part of a run.
struct Fiber {
    frames: SmallVec<[Frame; FRAME_INLINE_CAPACITY]>,
    sink: Sink,
}

/// Evaluates `program` on the current thread until it finishes or suspends.
pub(crate) fn execute(program: Program, sink: Sink) {
    drive(
        Control::Eval(program),
        Fiber {
            frames: SmallVec::new(),
            sink,
        },
    );
}

/// Runs `function`, turning a panic into an [`Error`].
fn guard<R>(function: impl FnOnce() -> R) -> Result<R, Error> {
    catch_unwind(AssertUnwindSafe(function)).map_err(Error::from_panic)
}

fn drive(mut control: Control, mut fiber: Fiber) {
    loop {
        control = match control {
            Control::Eval(program) => match program.step() {
                Step::Pure(value) => Control::Value(value),
                Step::Delay(thunk) => match guard(thunk) {
                    Ok(outcome) => Control::from_outcome(outcome),
                    Err(error) => Control::Fail(error),
                },
                Step::Suspend(thunk) => match guard(thunk) {
                    Ok(next) => Control::Eval(next),
                    Err(error) => Control::Fail(error),
                },
                Step::Raise(error) => Control::Fail(error),
                Step::Recover(source, handler) => {
                    fiber.frames.push(Frame::Recover(handler));
                    Control::Eval(source)
                }
                Step::Bind(source, continuation) => {
                    fiber.frames.push(Frame::Bind(continuation));
                    Control::Eval(source)
                }
                Step::Async(register) => match park(register, fiber) {
                    Parked::Detached => return,
                    Parked::Ready(resumed, next) => {
                        fiber = resumed;
                        next
                    }
                },
            },

            Control::Value(value) => match fiber.frames.pop() {
                Some(Frame::Bind(continuation)) => match guard(move || continuation(value)) {
                    Ok(next) => Control::Eval(next),
                    Err(error) => Control::Fail(error),
                },
                Some(Frame::Recover(_)) => Control::Value(value),
                None => {
                    (fiber.sink)(Ok(value));
                    return;
                }
            },

            Control::Fail(error) => match fiber.frames.pop() {
                Some(Frame::Bind(_)) => Control::Fail(error),
                Some(Frame::Recover(handler)) => match guard(|| handler(&error)) {
                    Ok(Some(replacement)) => Control::Eval(replacement),
                    Ok(None) => Control::Fail(error),
                    Err(panic) => Control::Fail(panic),
                },
                None => {
                    tracing::debug!(error = %error, "effect finished with an unrecovered error");
                    (fiber.sink)(Err(error));
                    return;
                }
            },
        };
    }
}

// =============================================================================
// Suspension handshake
// =============================================================================

const REGISTERING: u8 = 0;
const DETACHED: u8 = 1;
const DELIVERED: u8 = 2;

/// Meeting point between a suspended loop and the callback that resumes it.
struct Handoff {
    phase: AtomicU8,
    // Set by the first delivery; later ones are dropped.
    claimed: AtomicBool,
    parked: Mutex<Option<Fiber>>,
    outcome: Mutex<Option<Outcome>>,
}

enum Parked {
    Detached,
    Ready(Fiber, Control),
}

impl Handoff {
    fn new(fiber: Fiber) -> Self {
        Self {
            phase: AtomicU8::new(REGISTERING),
            claimed: AtomicBool::new(false),
            parked: Mutex::new(Some(fiber)),
            outcome: Mutex::new(None),
        }
    }

    fn deliver(&self, outcome: Outcome) {
        if self.claimed.swap(true, Ordering::AcqRel) {
            tracing::debug!("ignoring a second outcome for a suspended effect");
            return;
        }
        *self.outcome.lock() = Some(outcome);

        if self
            .phase
            .compare_exchange(REGISTERING, DELIVERED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // The loop is still inside `register` and will pick the outcome up.
            return;
        }

        tracing::trace!("resuming suspended effect on the delivering thread");
        let (fiber, outcome) = self.take();
        drive(Control::from_outcome(outcome), fiber);
    }

    /// Returns `true` if the loop gave up the fiber to the callback.
    fn try_detach(&self) -> bool {
        self.phase
            .compare_exchange(REGISTERING, DETACHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn take(&self) -> (Fiber, Outcome) {
        let fiber = self
            .parked
            .lock()
            .take()
            .expect("interpreter internal error: suspended fiber resumed twice");
        let outcome = self
            .outcome
            .lock()
            .take()
            .expect("interpreter internal error: resumed without an outcome");
        (fiber, outcome)
    }
}

fn park(register: Box<dyn FnOnce(Sink) + Send>, fiber: Fiber) -> Parked {
    let handoff = Arc::new(Handoff::new(fiber));
    let resumer = Arc::clone(&handoff);
    let callback: Sink = Box::new(move |outcome| resumer.deliver(outcome));

    if let Err(error) = guard(move || register(callback)) {
        handoff.deliver(Err(error));
    }

    if handoff.try_detach() {
        tracing::trace!("effect suspended awaiting an asynchronous outcome");
        return Parked::Detached;
    }

    let (fiber, outcome) = handoff.take();
    Parked::Ready(fiber, Control::from_outcome(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::IO;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[rstest]
    fn test_deep_left_nested_flat_map() {
        let mut io = IO::pure(0_u64);
        for _ in 0..100_000 {
            io = io.flat_map(|x| IO::pure(x + 1));
        }
        assert_eq!(io.run().unwrap(), 100_000);
    }

    #[rstest]
    fn test_deep_right_nested_suspend() {
        fn count(n: u64, acc: u64) -> IO<u64> {
            if n == 0 {
                IO::pure(acc)
            } else {
                IO::suspend(move || count(n - 1, acc + 1)).flat_map(IO::pure)
            }
        }
        assert_eq!(count(100_000, 0).run().unwrap(), 100_000);
    }

    #[rstest]
    fn test_error_skips_bind_frames() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let io = IO::<i32>::raise_error(Error::msg("early")).map(move |x| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            x
        });
        assert!(io.run().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_value_skips_recover_frames() {
        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = Arc::clone(&handled);
        let io = IO::pure(3).recover(move |_| {
            handled_clone.fetch_add(1, Ordering::SeqCst);
            Some(0)
        });
        assert_eq!(io.run().unwrap(), 3);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_panicking_continuation_becomes_error() {
        let io = IO::pure(1).map(|_: i32| -> i32 { panic!("bad continuation") });
        let error = io.run().unwrap_err();
        assert!(error.is_panic());
        assert_eq!(error.to_string(), "effect panicked: bad continuation");
    }

    #[rstest]
    fn test_panicking_register_becomes_error() {
        let io = IO::<i32>::from_callback(|_| panic!("register failed"));
        assert!(io.run().unwrap_err().is_panic());
    }

    #[rstest]
    fn test_callback_after_register_panic_is_ignored() {
        let late = Arc::new(Mutex::new(None));
        let late_clone = Arc::clone(&late);
        let io = IO::<i32>::from_callback(move |callback| {
            *late_clone.lock() = Some(thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                callback(Ok(1));
            }));
            panic!("register failed after handing off");
        });
        assert!(io.run().unwrap_err().is_panic());
        let handle = late.lock().take().unwrap();
        assert!(handle.join().is_ok());
    }

    #[rstest]
    fn test_synchronous_callback_continues_in_place() {
        let io = IO::from_callback(|callback| callback(Ok(4))).map(|x: i32| x + 1);
        assert_eq!(io.run().unwrap(), 5);
    }

    #[rstest]
    fn test_callback_from_other_thread_resumes_fiber() {
        let io = IO::from_callback(|callback| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                callback(Ok(20));
            });
        })
        .flat_map(|x: i32| IO::delay(move || x * 2));
        assert_eq!(io.run().unwrap(), 40);
    }

    #[rstest]
    fn test_many_sequential_suspensions() {
        let mut io = IO::pure(0_u32);
        for _ in 0..1_000 {
            io = io.flat_map(|x| {
                IO::from_callback(move |callback| {
                    thread::spawn(move || callback(Ok(x + 1)));
                })
            });
        }
        assert_eq!(io.run().unwrap(), 1_000);
    }
}
