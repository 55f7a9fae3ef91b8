use std::fmt::{self, Display};
use std::time::{Duration, Instant};

use super::clock;

/// States of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// A closed breaker is operating normally and counting consecutive failures.
    Closed,
    /// An open breaker has tripped and rejects calls until the recovery time has elapsed since
    /// the last failure.
    Open,
    /// A half open breaker lets calls through to probe the backend. One failure opens it again,
    /// enough consecutive successes close it.
    HalfOpen,
}

impl State {
    /// Returns a string value for the state identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.write_str(self.as_str())
    }
}

/// Consumes the state machine events. May used for metrics and/or logs.
///
/// All methods are called while the breaker's lock is held, so implementations must not call
/// back into the same breaker.
pub trait Instrument {
    /// Calls when state machine reject a call.
    fn on_call_rejected(&self);

    /// Calls when the circuit breaker become to open state.
    fn on_open(&self);

    /// Calls when the circuit breaker become to half open state.
    fn on_half_open(&self);

    /// Calls when the circuit breaker become to closed state.
    fn on_closed(&self);

    /// Calls when an operation exceeded its timeout.
    fn on_timeout(&self, _timeout: Duration) {}
}

impl Instrument for () {
    #[inline]
    fn on_call_rejected(&self) {}

    #[inline]
    fn on_open(&self) {}

    #[inline]
    fn on_half_open(&self) {}

    #[inline]
    fn on_closed(&self) {}
}

/// The state machine's answer to a call attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Run the operation and report its outcome via `on_success` or `on_error`.
    Permitted,
    /// The circuit is open; the operation must not run.
    Rejected,
    /// The recovery window elapsed and the circuit moved to half open. This attempt is spent on
    /// the transition and the operation must not run; the caller should call again to probe.
    HalfOpened,
}

/// A circuit breaker's state machine.
///
/// It is implemented via a finite state machine with three states: `Closed`, `Open` and
/// `HalfOpen`. The state machine does not know anything about the backend by itself, but uses the
/// outcomes reported via `on_success` and `on_error`. Before communicating with the backend, the
/// permission to do so must be obtained via `admit`.
///
/// The state changes from `Closed` to `Open` once `failure_threshold` consecutive failures have
/// been reported. A single success in between resets the counter.
///
/// While `Open`, every call is rejected until more than `recovery_time` has passed since the last
/// failure. The first attempt after that switches to `HalfOpen` without running anything. In
/// `HalfOpen` a single failure reopens the circuit, and `half_open_max_requests` consecutive
/// successes close it.
#[derive(Debug)]
pub struct StateMachine<INSTRUMENT> {
    instrument: INSTRUMENT,
    state: State,
    failure_count: u32,
    half_open_success_count: u32,
    last_failure_time: Instant,
    failure_threshold: u32,
    recovery_time: Duration,
    half_open_max_requests: u32,
}

impl<INSTRUMENT> StateMachine<INSTRUMENT>
where
    INSTRUMENT: Instrument,
{
    /// Creates a new closed state machine.
    ///
    /// # Panics
    ///
    /// * When `failure_threshold` or `half_open_max_requests` is zero.
    pub fn new(
        failure_threshold: u32,
        recovery_time: Duration,
        half_open_max_requests: u32,
        instrument: INSTRUMENT,
    ) -> Self {
        assert!(failure_threshold > 0, "failure threshold must be positive");
        assert!(
            half_open_max_requests > 0,
            "half-open max requests must be positive"
        );

        StateMachine {
            instrument,
            state: State::Closed,
            failure_count: 0,
            half_open_success_count: 0,
            last_failure_time: clock::now(),
            failure_threshold,
            recovery_time,
            half_open_max_requests,
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Failures observed since the last reset.
    #[inline]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Successes observed in the current half open episode.
    #[inline]
    pub fn half_open_success_count(&self) -> u32 {
        self.half_open_success_count
    }

    /// Requests permission to call this circuit breaker's backend.
    pub fn admit(&mut self) -> Admission {
        tracing::debug!(state = %self.state, "making a call");

        match self.state {
            State::Closed | State::HalfOpen => Admission::Permitted,
            State::Open => {
                let elapsed = clock::now().saturating_duration_since(self.last_failure_time);
                if elapsed > self.recovery_time {
                    self.transit_to_half_open();
                    return Admission::HalfOpened;
                }

                tracing::warn!(?elapsed, "circuit is still open, rejecting call");
                self.instrument.on_call_rejected();
                Admission::Rejected
            }
        }
    }

    /// Records a successful call.
    pub fn on_success(&mut self) {
        match self.state {
            State::Closed => {
                if self.failure_count > 0 {
                    tracing::debug!(
                        failure_count = self.failure_count,
                        "call succeeded in closed state, clearing failures"
                    );
                }
                self.failure_count = 0;
            }
            State::HalfOpen => {
                self.half_open_success_count += 1;
                tracing::info!(
                    success_count = self.half_open_success_count,
                    "call succeeded in half-open state"
                );

                if self.half_open_success_count >= self.half_open_max_requests {
                    self.reset();
                }
            }
            State::Open => {}
        }
    }

    /// Records a failed call.
    pub fn on_error(&mut self) {
        match self.state {
            State::Closed => {
                self.failure_count += 1;
                self.last_failure_time = clock::now();
                tracing::warn!(
                    failure_count = self.failure_count,
                    "call failed in closed state"
                );

                if self.failure_count >= self.failure_threshold {
                    tracing::error!(
                        failure_threshold = self.failure_threshold,
                        "failure threshold reached, transitioning to open"
                    );
                    self.transit_to_open();
                }
            }
            State::HalfOpen => {
                self.last_failure_time = clock::now();
                tracing::error!("call failed in half-open state, transitioning to open");
                self.transit_to_open();
            }
            State::Open => {}
        }
    }

    /// Records a call which ran out of time. Counts as a failure.
    pub fn on_timeout(&mut self, timeout: Duration) {
        tracing::warn!(?timeout, state = %self.state, "call timed out");
        self.instrument.on_timeout(timeout);
        self.on_error();
    }

    /// Returns the circuit breaker to its original closed state, losing statistics.
    pub fn reset(&mut self) {
        self.state = State::Closed;
        self.failure_count = 0;
        self.half_open_success_count = 0;
        tracing::info!("circuit reset to closed state");
        self.instrument.on_closed();
    }

    #[inline]
    fn transit_to_half_open(&mut self) {
        self.state = State::HalfOpen;
        self.failure_count = 0;
        self.half_open_success_count = 0;
        tracing::info!("recovery period over, transitioning to half-open");
        self.instrument.on_half_open();
    }

    #[inline]
    fn transit_to_open(&mut self) {
        self.state = State::Open;
        self.instrument.on_open();
    }
}
