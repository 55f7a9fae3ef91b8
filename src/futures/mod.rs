//! Futures aware circuit breaker.
//!
//! The same state machine as [`crate::CircuitBreaker`], for asynchronous operations on a tokio
//! runtime. The operation's future is spawned as its own task and raced against the timeout; on
//! timeout the task is left running and its output is discarded.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::time::Duration;
//!
//! use breakwater::futures::CircuitBreaker;
//!
//! let circuit_breaker =
//!     CircuitBreaker::new(3, Duration::from_secs(5), 2, Duration::from_millis(100));
//!
//! let res = circuit_breaker.call(|| async { Ok::<_, ()>(42) }).await;
//! assert_eq!(Ok(Some(42)), res);
//! # }
//! ```

use std::future::Future;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use self::deadline::Deadline;
use super::error::Error;
use super::executor::Completion;
use super::state_machine::{Admission, Instrument, State, StateMachine};

mod deadline;

/// Future aware circuit breaker.
///
/// The lock is held across the whole call, including the wait for the operation, so calls through
/// one breaker are fully serialized just like the blocking variant.
#[derive(Debug)]
pub struct CircuitBreaker<INSTRUMENT = ()> {
    inner: Arc<Inner<INSTRUMENT>>,
}

#[derive(Debug)]
struct Inner<INSTRUMENT> {
    state_machine: Mutex<StateMachine<INSTRUMENT>>,
    timeout: Duration,
}

impl CircuitBreaker<()> {
    /// Creates a closed circuit breaker, see [`crate::CircuitBreaker::new`].
    ///
    /// # Panics
    ///
    /// * When `failure_threshold` or `half_open_max_requests` is zero.
    pub fn new(
        failure_threshold: u32,
        recovery_time: Duration,
        half_open_max_requests: u32,
        timeout: Duration,
    ) -> Self {
        let state_machine =
            StateMachine::new(failure_threshold, recovery_time, half_open_max_requests, ());
        CircuitBreaker::from_parts(state_machine, timeout)
    }
}

impl<INSTRUMENT> CircuitBreaker<INSTRUMENT>
where
    INSTRUMENT: Instrument,
{
    pub(crate) fn from_parts(state_machine: StateMachine<INSTRUMENT>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state_machine: Mutex::new(state_machine),
                timeout,
            }),
        }
    }

    /// The per call timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Returns the current state. Waits for an in-flight call to finish.
    pub async fn state(&self) -> State {
        self.inner.state_machine.lock().await.state()
    }

    /// Executes the future produced by `f` within circuit breaker.
    ///
    /// The results are the same as for [`crate::CircuitBreaker::call`]; `f` is not called at all
    /// when the call is rejected or spent on the half open transition.
    ///
    /// # Panics
    ///
    /// * When called outside of a tokio runtime with time enabled.
    /// * When the operation panics, after the failure has been recorded.
    pub async fn call<F, FUT, T, E>(&self, f: F) -> Result<Option<T>, Error<E>>
    where
        F: FnOnce() -> FUT,
        FUT: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let mut state_machine = self.inner.state_machine.lock().await;

        match state_machine.admit() {
            Admission::Permitted => {}
            Admission::Rejected => return Err(Error::Rejected),
            Admission::HalfOpened => return Ok(None),
        }

        match Deadline::spawn(f(), self.inner.timeout).await {
            Completion::Finished(Ok(ok)) => {
                state_machine.on_success();
                Ok(Some(ok))
            }
            Completion::Finished(Err(err)) => {
                state_machine.on_error();
                Err(Error::Inner(err))
            }
            Completion::TimedOut => {
                state_machine.on_timeout(self.inner.timeout);
                Err(Error::Timeout(self.inner.timeout))
            }
            Completion::Panicked(payload) => {
                state_machine.on_error();
                drop(state_machine);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<INSTRUMENT> Clone for CircuitBreaker<INSTRUMENT> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
