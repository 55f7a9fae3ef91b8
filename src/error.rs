use std::time::Duration;

use thiserror::Error;

/// A `CircuitBreaker`'s error.
#[derive(Debug, PartialEq, Error)]
pub enum Error<E> {
    /// An error returned by the wrapped operation, passed through unchanged.
    #[error("{0}")]
    Inner(E),
    /// The call was rejected because the circuit is open.
    #[error("circuit open, call rejected")]
    Rejected,
    /// The operation did not complete before the configured timeout.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl<E> Error<E> {
    /// Returns `true` if the call was rejected without invoking the operation.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Error::Rejected)
    }

    /// Returns `true` if the operation ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns the operation's own error, if any.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Error::Inner(err) => Some(err),
            _ => None,
        }
    }
}

/// An invalid circuit breaker configuration.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `failure_threshold` must be at least one.
    #[error("failure threshold must be positive")]
    ZeroFailureThreshold,
    /// `half_open_max_requests` must be at least one.
    #[error("half-open max requests must be positive")]
    ZeroHalfOpenMaxRequests,
}
