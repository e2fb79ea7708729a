//! Top-level fault barrier.
//!
//! Each attempt runs in its own tokio task so a panic anywhere below it is
//! captured as a [`Fault`] instead of tearing the process down. A captured
//! fault triggers a soft retry until the attempt budget is spent; the last
//! fault is handed back so the caller can offer a hard reset.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::future::Future;

use serde::Serialize;
use serde_json::json;

use crate::security::{secure_log, LogLevel};

/// Unexpected failure captured by the barrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub message: String,
    /// Attempt (1-based) that produced the fault.
    pub attempt: u32,
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unexpected fault on attempt {}: {}", self.attempt, self.message)
    }
}

impl std::error::Error for Fault {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultBarrier {
    max_attempts: u32,
}

impl Default for FaultBarrier {
    fn default() -> Self {
        Self::new(2)
    }
}

impl FaultBarrier {
    /// `max_attempts` counts the first run; zero behaves like one.
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Run `factory()` until it completes without a fault.
    pub async fn run<T, F, Fut>(&self, mut factory: F) -> Result<T, Fault>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let fault = match tokio::spawn(factory()).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_panic() => Fault {
                    message: panic_message(error.into_panic()),
                    attempt,
                },
                Err(_) => Fault {
                    message: String::from("task was cancelled"),
                    attempt,
                },
            };

            secure_log(
                LogLevel::Error,
                "Unexpected fault captured",
                Some(json!({ "attempt": attempt, "error": fault.message })),
            );

            if attempt >= max_attempts {
                return Err(fault);
            }
            secure_log(
                LogLevel::Warn,
                "Retrying after fault",
                Some(json!({ "attempt": attempt + 1 })),
            );
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn soft_retry_recovers_from_a_single_panic() {
        let runs = Arc::new(AtomicU32::new(0));
        let barrier = FaultBarrier::new(2);

        let result = barrier
            .run(|| {
                let runs = Arc::clone(&runs);
                async move {
                    if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("render blew up");
                    }
                    "recovered"
                }
            })
            .await;

        assert_eq!(result, Ok("recovered"));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_the_last_fault() {
        let barrier = FaultBarrier::new(1);

        let result: Result<(), Fault> = barrier
            .run(|| async { panic!("{}", String::from("state corrupted")) })
            .await;

        assert_eq!(
            result,
            Err(Fault {
                message: String::from("state corrupted"),
                attempt: 1
            })
        );
    }
}
