//! Per-key sliding-window request gate.
//!
//! Each key owns the timestamps of its accepted requests inside the
//! trailing window. A check prunes everything at or before
//! `now - window`, rejects when the remaining count has reached the
//! capacity and otherwise records `now`. Rejected attempts are never
//! recorded, so a caller that keeps retrying does not extend its own ban.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, SharedClock, SystemClock};

/// Capacity and window of a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Limits applied to market-data API calls: 30 per minute.
    pub const fn api() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

/// Process-wide sliding-window limiter, shared by handle.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: SharedClock,
    windows: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with [`RateLimitConfig::api`] limits on the system clock.
    pub fn api() -> Self {
        Self::new(RateLimitConfig::api(), Arc::new(SystemClock))
    }

    pub const fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check-and-record for `key`. The whole operation holds the window lock.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut windows = self
            .windows
            .lock()
            .expect("rate limiter window lock is not poisoned");
        let history = windows.entry(key.to_owned()).or_default();
        prune(history, now, self.window_ms());

        if history.len() >= self.config.max_requests {
            return false;
        }

        history.push_back(now);
        true
    }

    /// Requests still available to `key` in the current window.
    pub fn remaining(&self, key: &str) -> usize {
        let now = self.clock.now_ms();
        let mut windows = self
            .windows
            .lock()
            .expect("rate limiter window lock is not poisoned");
        let used = match windows.get_mut(key) {
            Some(history) => {
                prune(history, now, self.window_ms());
                history.len()
            }
            None => 0,
        };
        self.config.max_requests.saturating_sub(used)
    }

    fn window_ms(&self) -> u64 {
        self.config.window.as_millis().min(u128::from(u64::MAX)) as u64
    }
}

fn prune(history: &mut VecDeque<u64>, now: u64, window_ms: u64) {
    // Before the clock has run a full window nothing can have expired.
    let Some(window_start) = now.checked_sub(window_ms) else {
        return;
    };
    while history.front().is_some_and(|&ts| ts <= window_start) {
        history.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max_requests: usize, window_ms: u64) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(100_000));
        let limiter = RateLimiter::new(
            RateLimitConfig {
                max_requests,
                window: Duration::from_millis(window_ms),
            },
            clock.clone(),
        );
        (clock, limiter)
    }

    #[test]
    fn rejects_the_call_after_capacity_within_window() {
        let (clock, limiter) = limiter(3, 1_000);

        for _ in 0..3 {
            assert!(limiter.is_allowed("getCoinData_bitcoin"));
            clock.advance(Duration::from_millis(100));
        }
        assert!(!limiter.is_allowed("getCoinData_bitcoin"));
        assert_eq!(limiter.remaining("getCoinData_bitcoin"), 0);
    }

    #[test]
    fn expired_entries_free_exactly_their_capacity() {
        let (clock, limiter) = limiter(3, 1_000);

        // Accepted at 100_000, 100_100 and 100_200.
        for _ in 0..3 {
            assert!(limiter.is_allowed("k"));
            clock.advance(Duration::from_millis(100));
        }

        // At 101_000 only the first entry sits on the window boundary.
        clock.set(101_000);
        assert_eq!(limiter.remaining("k"), 1);
        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));

        // At 101_200 the second and third have expired as well.
        clock.set(101_200);
        assert_eq!(limiter.remaining("k"), 2);
    }

    #[test]
    fn rejected_attempts_are_not_recorded() {
        let (clock, limiter) = limiter(1, 1_000);

        assert!(limiter.is_allowed("k"));
        for _ in 0..5 {
            clock.advance(Duration::from_millis(150));
            assert!(!limiter.is_allowed("k"));
        }

        // Only the single accepted call ages out; the rejections left no trace.
        clock.set(101_000);
        assert!(limiter.is_allowed("k"));
    }

    #[test]
    fn keys_are_independent() {
        let (_clock, limiter) = limiter(1, 60_000);
        assert!(limiter.is_allowed("getPrices_bitcoin"));
        assert!(limiter.is_allowed("getPrices_ethereum"));
        assert!(!limiter.is_allowed("getPrices_bitcoin"));
    }

    #[test]
    fn early_clock_values_do_not_prune() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
            clock.clone(),
        );
        assert!(limiter.is_allowed("k"));
        clock.advance(Duration::from_millis(10));
        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
    }

    #[test]
    fn concurrent_callers_never_exceed_capacity() {
        let (_clock, limiter) = limiter(30, 60_000);
        let limiter = Arc::new(limiter);

        let handles = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..10).filter(|_| limiter.is_allowed("shared")).count())
            })
            .collect::<Vec<_>>();

        let accepted: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread join"))
            .sum();
        assert_eq!(accepted, 30);
    }

    #[test]
    fn defaults_match_documented_limits() {
        assert_eq!(RateLimitConfig::default().max_requests, 10);
        assert_eq!(RateLimitConfig::api().max_requests, 30);
        assert_eq!(RateLimitConfig::api().window, Duration::from_secs(60));
    }
}
