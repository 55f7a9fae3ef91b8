//! CircuitBreaker is used to detect failures and encapsulates the logic of preventing a failure
//! from constantly recurring, during maintenance, temporary external system failure or unexpected
//! system difficulties.
//!
//! The breaker counts consecutive failures. Once `failure_threshold` calls in a row have failed or
//! timed out, it opens and rejects every call until `recovery_time` has passed since the last
//! failure. The first call after that only moves the breaker to half open and returns
//! `Ok(None)`; the following calls probe the backend, and `half_open_max_requests` successes in a
//! row close the circuit again while a single failure reopens it.
//!
//! Each operation runs on its own thread with a deadline. A call that misses the deadline fails
//! with [`Error::Timeout`], and the operation is left to finish in the background.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use breakwater::{CircuitBreaker, Error, State};
//!
//! let circuit_breaker =
//!     CircuitBreaker::new(2, Duration::from_secs(1), 2, Duration::from_millis(50));
//!
//! for _ in 0..2 {
//!     assert_eq!(Err(Error::Inner("x")), circuit_breaker.call(|| Err::<(), _>("x")));
//! }
//! assert_eq!(State::Open, circuit_breaker.state());
//! assert_eq!(Err(Error::Rejected), circuit_breaker.call(|| Ok::<_, &str>(())));
//! ```
//!
//! See https://martinfowler.com/bliki/CircuitBreaker.html

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

mod circuit_breaker;
mod config;
mod error;
mod executor;
mod state_machine;

pub mod clock;
#[cfg(feature = "futures-support")]
pub mod futures;

pub use self::circuit_breaker::CircuitBreaker;
pub use self::config::Config;
pub use self::error::{ConfigError, Error};
pub use self::state_machine::{Admission, Instrument, State, StateMachine};
