//! Bounded retry with exponential backoff for outbound service calls.
//!
//! # Backoff Strategy
//!
//! The delay after failed attempt `n` (counting from 1) is:
//! ```text
//! delay = initial_delay * 2^(n-1)
//! ```
//! No jitter is added and no delay follows the last attempt. With the defaults
//! (3 attempts, 1 s) a call that keeps failing waits 1 s, then 2 s, then gives up.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::RetryExhausted;

/// Retry policy: total attempts and the delay before the first retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts, including the first; a value of 0 still makes one attempt.
    pub max_attempts: usize,
    pub initial_delay: Duration,
}

impl Backoff {
    pub fn new(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(2u32.checked_pow(shift).unwrap_or(u32::MAX))
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// # Returns
    ///
    /// The first success, or [`RetryExhausted`] carrying the last error.
    pub async fn retry<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let max = self.max_attempts.max(1);
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt >= max {
                        error!(
                            attempt,
                            max,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "Request exhausted retries"
                        );
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }

                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "Request attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempt(s) from {:?}",
            self.max_attempts.max(1),
            self.initial_delay
        )
    }
}

/// Call `op` up to `max_attempts` times, doubling `initial_delay` between attempts.
pub async fn fetch_with_retry<T, E, F, Fut>(
    max_attempts: usize,
    initial_delay: Duration,
    op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    Backoff::new(max_attempts, initial_delay).retry(op).await
}
