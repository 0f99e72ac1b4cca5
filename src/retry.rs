//! Retry combinators for `OxiProof`.
//!
//! Two flavours live here:
//!
//! - [`BoundedRetry`] is the engine's combinator. It makes up to a fixed
//!   number of attempts with no delay and reports [`RetryExhausted`] when
//!   none succeeds. Justification, audit and the locator's outer rounds all
//!   go through it.
//! - [`RetryPolicy`] adds exponential backoff with optional jitter. It is
//!   used by [`RetryingOracle`](crate::oracle::RetryingOracle) to ride out
//!   transport failures below the engine.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{OracleError, ResponseError, RetryExhausted};

/// Trait for errors that can indicate whether they are retryable.
pub trait Retryable {
    /// Returns true if the error is transient and the operation should be retried.
    fn is_retryable(&self) -> bool;

    /// Returns a human-readable error message for logging.
    fn error_message(&self) -> String;
}

impl Retryable for OracleError {
    fn is_retryable(&self) -> bool {
        match self {
            OracleError::Unavailable(_) | OracleError::Timeout(_) | OracleError::Backend(_) => {
                true
            }
            // Blank text is retried by the engine, not the transport.
            OracleError::EmptyResponse => false,
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

impl Retryable for ResponseError {
    fn is_retryable(&self) -> bool {
        true
    }

    fn error_message(&self) -> String {
        self.to_string()
    }
}

/// A fixed-ceiling retry loop without delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    operation: &'static str,
    max_attempts: usize,
}

impl BoundedRetry {
    /// Create a combinator making at most `max_attempts` attempts.
    #[must_use]
    pub const fn new(operation: &'static str, max_attempts: usize) -> Self {
        Self {
            operation,
            max_attempts,
        }
    }

    /// Label used in logs and in [`RetryExhausted::operation`].
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Run `attempt` until it succeeds, returns a non-retryable error, or
    /// the ceiling is reached. The closure receives the 1-based attempt
    /// number.
    ///
    /// # Errors
    ///
    /// Returns [`RetryExhausted`] carrying the last rejected attempt.
    pub async fn run<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut last = None;
        let mut made = 0;

        for number in 1..=self.max_attempts {
            made = number;
            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::info!(
                        operation = self.operation,
                        attempt = number,
                        max_attempts = self.max_attempts,
                        "Attempt rejected: {}",
                        e.error_message()
                    );
                    let stop = !e.is_retryable();
                    last = Some(e);
                    if stop {
                        break;
                    }
                }
            }
        }

        Err(RetryExhausted {
            operation: self.operation,
            attempts: made,
            last,
        })
    }
}

/// A retry policy that implements exponential backoff with optional jitter.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with no retries (fail immediately).
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            config: RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
        }
    }

    /// Get the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.config.max_delay_ms as f64);

        let final_delay = if self.config.add_jitter {
            // Scale by a factor in [0.5, 1.5)
            capped_delay * (0.5 + simple_random())
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Execute an async operation, retrying retryable errors with backoff.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once
    /// `max_retries` retries have been spent.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Oracle call failed, retrying: {}",
                        e.error_message()
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Simple pseudo-random number generator for jitter.
/// Uses a basic LCG (Linear Congruential Generator) seeded from system time.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn simple_random() -> f64 {
    use std::cell::Cell;
    use std::time::SystemTime;

    thread_local! {
        static SEED: Cell<u64> = Cell::new(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        );
    }

    SEED.with(|seed| {
        let s = seed
            .get()
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        seed.set(s);
        (s >> 11) as f64 / (1u64 << 53) as f64
    })
}

#[cfg(feature = "native")]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Without a timer the backoff degrades to immediate retries.
#[cfg(not(feature = "native"))]
async fn sleep(_duration: Duration) {}
