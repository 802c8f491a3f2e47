//! Resilience policy for upstream calls
//!
//! Explicit timeouts for the shared HTTP clients and a reusable retry
//! policy built on the `backon` crate.

pub mod timeout {
    //! Timeout configuration for outbound HTTP
    //!
    //! The upstream transport gets explicit values instead of relying on
    //! library defaults; both shared clients apply these at construction.

    use std::time::Duration;

    /// TCP connect timeout for upstream and relay requests
    pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Total request timeout for upstream API calls
    pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

use std::time::Duration;

use backon::ExponentialBuilder;

/// Retry policy for transient upstream failures
///
/// A value object (attempt cap, delay bounds) so tests can construct a
/// fast variant; the retryable-error predicate stays with the error type.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            min_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff with jitter, capped at `max_delay`
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Policy that never sleeps meaningfully, for tests
    #[must_use]
    pub fn fast(max_retries: usize) -> Self {
        Self {
            max_retries,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }
}
