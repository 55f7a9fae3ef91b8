use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::error::ConfigError;
use super::state_machine::{Instrument, StateMachine};

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RECOVERY_TIME: Duration = Duration::from_secs(5);
const DEFAULT_HALF_OPEN_MAX_REQUESTS: u32 = 2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// A `CircuitBreaker`'s configuration.
///
/// With the `serde` feature the numeric settings can be loaded from any serde format, with
/// durations written as humantime strings such as `"5s"` or `"50ms"`. Missing fields take the
/// defaults of [`Config::new`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        default,
        deny_unknown_fields,
        bound(serialize = "", deserialize = "INSTRUMENT: Default")
    )
)]
pub struct Config<INSTRUMENT = ()> {
    pub(crate) failure_threshold: u32,
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub(crate) recovery_time: Duration,
    pub(crate) half_open_max_requests: u32,
    #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
    pub(crate) timeout: Duration,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) instrument: INSTRUMENT,
}

impl Config<()> {
    /// Creates a new circuit breaker's default configuration: trip after 3 consecutive failures,
    /// stay open for 5s, close after 2 successful probes, give up on a call after 2s.
    pub fn new() -> Self {
        Config::default()
    }
}

impl<INSTRUMENT> Default for Config<INSTRUMENT>
where
    INSTRUMENT: Default,
{
    fn default() -> Self {
        Config {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_time: DEFAULT_RECOVERY_TIME,
            half_open_max_requests: DEFAULT_HALF_OPEN_MAX_REQUESTS,
            timeout: DEFAULT_TIMEOUT,
            instrument: INSTRUMENT::default(),
        }
    }
}

impl<INSTRUMENT> Config<INSTRUMENT> {
    /// Number of consecutive failures in the closed state which opens the circuit.
    pub fn failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Minimum time the circuit stays open after the last failure.
    pub fn recovery_time(mut self, recovery_time: Duration) -> Self {
        self.recovery_time = recovery_time;
        self
    }

    /// Number of consecutive successful probes in the half open state which closes the circuit.
    pub fn half_open_max_requests(mut self, half_open_max_requests: u32) -> Self {
        self.half_open_max_requests = half_open_max_requests;
        self
    }

    /// How long a single call may run before it counts as failed.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configures `Instrument` for a circuit breaker.
    pub fn instrument<T>(self, instrument: T) -> Config<T>
    where
        T: Instrument,
    {
        Config {
            failure_threshold: self.failure_threshold,
            recovery_time: self.recovery_time,
            half_open_max_requests: self.half_open_max_requests,
            timeout: self.timeout,
            instrument,
        }
    }

    /// Checks that both counters are positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.half_open_max_requests == 0 {
            return Err(ConfigError::ZeroHalfOpenMaxRequests);
        }
        Ok(())
    }

    /// Builds a new circuit breaker instance.
    pub fn build(self) -> Result<CircuitBreaker<INSTRUMENT>, ConfigError>
    where
        INSTRUMENT: Instrument,
    {
        let (state_machine, timeout) = self.into_parts()?;
        Ok(CircuitBreaker::from_parts(state_machine, timeout))
    }

    /// Builds a new futures aware circuit breaker instance.
    #[cfg(feature = "futures-support")]
    pub fn build_async(self) -> Result<crate::futures::CircuitBreaker<INSTRUMENT>, ConfigError>
    where
        INSTRUMENT: Instrument,
    {
        let (state_machine, timeout) = self.into_parts()?;
        Ok(crate::futures::CircuitBreaker::from_parts(
            state_machine,
            timeout,
        ))
    }

    fn into_parts(self) -> Result<(StateMachine<INSTRUMENT>, Duration), ConfigError>
    where
        INSTRUMENT: Instrument,
    {
        self.validate()?;
        let state_machine = StateMachine::new(
            self.failure_threshold,
            self.recovery_time,
            self.half_open_max_requests,
            self.instrument,
        );
        Ok((state_machine, self.timeout))
    }
}
