//! Fixed-window login attempt limiting.
//!
//! Each key (an identity or an origin address) gets a counter that opens a
//! window on its first attempt. Up to `max_attempts` attempts are admitted
//! inside the window; further attempts are refused with the time left until
//! the window closes. The first attempt after the window closes starts a new
//! window with a count of one.

use std::collections::HashMap;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use parking_lot::Mutex;

/// Calls to [`RateLimiter::check_and_increment`] between idle-counter sweeps.
const PRUNE_EVERY: u64 = 256;

/// Configuration for a fixed-window rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_attempts: u32,
    window: Duration,
}

impl RateLimitConfig {
    /// Creates a new rate limit configuration.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Attempts admitted per window (must be >= 1)
    /// * `window` - Window length (must be non-zero)
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` or `window` is zero.
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        assert!(!window.is_zero(), "window must be non-zero");
        Self {
            max_attempts,
            window,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitConfig {
    /// Five attempts per minute.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Zero when allowed
    pub retry_after: Duration,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
        }
    }

    fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
        }
    }
}

#[derive(Debug)]
struct AttemptCounter {
    window_start: DateTime<Utc>,
    count: u32,
}

impl AttemptCounter {
    /// Time since the window opened. A clock that stepped backwards counts as
    /// no time elapsed.
    fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.window_start).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Default)]
struct Counters {
    by_key: HashMap<String, AttemptCounter>,
    calls: u64,
}

/// Per-key attempt limiter.
///
/// Thread-safe via an internal `parking_lot::Mutex`; the check and the
/// increment happen under the same lock, so concurrent attempts for one key
/// can never all observe a count below the limit.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    counters: Mutex<Counters>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record an attempt for `key` and decide whether to admit it.
    ///
    /// Refused attempts are not counted and do not extend the window.
    pub fn check_and_increment(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut guard = self.counters.lock();
        let counters = &mut *guard;

        counters.calls += 1;
        if counters.calls % PRUNE_EVERY == 0 {
            prune_idle(&mut counters.by_key, self.config.window, now);
        }

        let Some(counter) = counters.by_key.get_mut(key) else {
            counters.by_key.insert(
                key.to_string(),
                AttemptCounter {
                    window_start: now,
                    count: 1,
                },
            );
            return RateLimitDecision::allow();
        };

        let elapsed = counter.elapsed(now);
        if elapsed >= self.config.window {
            counter.window_start = now;
            counter.count = 1;
            return RateLimitDecision::allow();
        }

        if counter.count >= self.config.max_attempts {
            return RateLimitDecision::deny(self.config.window - elapsed);
        }

        counter.count += 1;
        RateLimitDecision::allow()
    }

    /// Forget all attempts recorded for `key`.
    pub fn reset(&self, key: &str) {
        self.counters.lock().by_key.remove(key);
    }

    /// Drop counters whose window has closed.
    ///
    /// # Returns
    /// Number of counters removed
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        prune_idle(&mut self.counters.lock().by_key, self.config.window, now)
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().by_key.len()
    }
}

fn prune_idle(
    counters: &mut HashMap<String, AttemptCounter>,
    window: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = counters.len();
    counters.retain(|_, counter| counter.elapsed(now) < window);
    before - counters.len()
}
