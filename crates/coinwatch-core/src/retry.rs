//! Retry policies and the async retry driver.

use std::future::Future;
use std::time::Duration;

use crate::error::ServiceError;
use crate::http_client::HttpError;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `step * n` after the n-th failure.
    Linear { step: Duration },
    /// `base * factor^(n-1)`, capped at `max`, with optional +/- 50% jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            step: Duration::from_millis(1_000),
        }
    }
}

impl Backoff {
    /// Delay to wait after `failed_attempts` failures (1-based).
    pub fn delay(self, failed_attempts: u32) -> Duration {
        let n = failed_attempts.max(1);
        match self {
            Self::Linear { step } => step.saturating_mul(n),
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(n.saturating_sub(1).min(i32::MAX as u32) as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(seconds.max(0.0));

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms = delay.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, Duration::from_millis(1_000))
    }
}

impl RetryPolicy {
    pub const fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { step },
        }
    }

    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(200),
                factor: 2.0,
                max: Duration::from_secs(3),
                jitter: true,
            },
        }
    }

    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        self.backoff.delay(failed_attempts)
    }
}

/// Errors that know whether another attempt can help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ServiceError {
    fn is_retryable(&self) -> bool {
        self.retryable()
    }
}

impl Retryable for HttpError {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Outcome of [`retry`] together with the number of attempts issued.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with a non-retryable error or
/// the policy's attempt budget is spent. `operation` receives the 1-based
/// attempt number.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Attempted<T, E>
where
    E: Retryable,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(error) => {
                if attempt >= max_attempts || !error.is_retryable() {
                    return Attempted {
                        result: Err(error),
                        attempts: attempt,
                    };
                }
                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
        }
    }
}
