use std::panic;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::config::Config;
use super::error::Error;
use super::executor::{self, Completion};
use super::state_machine::{Admission, Instrument, State, StateMachine};

/// A circuit breaker guarding a blocking, fallible operation.
///
/// Every call holds the breaker's lock from admission until the outcome is recorded, so at most
/// one operation per breaker runs at a time and concurrent callers queue up. Clones share the
/// same state; separately constructed breakers are fully independent.
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
    /// Creates a closed circuit breaker.
    ///
    /// * `failure_threshold` - consecutive failures which open the circuit.
    /// * `recovery_time` - how long the circuit stays open after the last failure.
    /// * `half_open_max_requests` - consecutive successful probes which close the circuit.
    /// * `timeout` - how long a single call may run before it counts as failed.
    ///
    /// # Panics
    ///
    /// * When `failure_threshold` or `half_open_max_requests` is zero. Use [`Config::build`] to
    ///   get an error instead.
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

    /// Returns a circuit breaker's builder.
    pub fn builder() -> Config {
        Config::new()
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
    pub fn state(&self) -> State {
        self.inner.state_machine.lock().state()
    }

    /// Executes a given function within circuit breaker.
    ///
    /// Returns
    ///
    /// * `Ok(Some(value))` when the function succeeded in time.
    /// * `Ok(None)` when the recovery window has just elapsed. The circuit is now half open and
    ///   the function was not called; call again to probe the backend.
    /// * `Err(Error::Rejected)` when the circuit is open. The function was not called.
    /// * `Err(Error::Timeout(_))` when the function did not return within the timeout. It keeps
    ///   running on its own thread and its result is discarded.
    /// * `Err(Error::Inner(err))` when the function failed.
    ///
    /// Timeouts and errors both count as failures. If the function panics, the failure is
    /// recorded and the panic is resumed on the calling thread.
    pub fn call<F, T, E>(&self, f: F) -> Result<Option<T>, Error<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let mut state_machine = self.inner.state_machine.lock();

        match state_machine.admit() {
            Admission::Permitted => {}
            Admission::Rejected => return Err(Error::Rejected),
            Admission::HalfOpened => return Ok(None),
        }

        match executor::run_with_timeout(self.inner.timeout, f) {
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
