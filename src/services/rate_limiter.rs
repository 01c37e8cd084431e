//! Fixed-window request counter keyed by client address.
//!
//! State lives in process memory only and resets on restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Source of "now" for window bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

/// Expired windows are dropped once the map grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_seconds),
            Arc::new(SystemClock),
        )
    }

    /// Counts one request for `key` and says whether it may proceed.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return RateDecision::Limited {
                retry_after: self.window.saturating_sub(now.duration_since(entry.started)),
            };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, secs: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(max, Duration::from_secs(secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_allows_up_to_max_then_limits() {
        let (limiter, _clock) = limiter(10, 60);

        for i in 0..10 {
            assert_eq!(
                limiter.check("1.2.3.4"),
                RateDecision::Allowed { remaining: 9 - i }
            );
        }

        assert!(matches!(
            limiter.check("1.2.3.4"),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (limiter, clock) = limiter(2, 60);

        limiter.check("ip");
        limiter.check("ip");
        clock.advance(Duration::from_secs(59));
        assert_eq!(
            limiter.check("ip"),
            RateDecision::Limited {
                retry_after: Duration::from_secs(1)
            }
        );

        clock.advance(Duration::from_secs(1));
        assert_eq!(limiter.check("ip"), RateDecision::Allowed { remaining: 1 });
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(1, 60);

        assert!(matches!(limiter.check("a"), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a"), RateDecision::Limited { .. }));
        assert!(matches!(limiter.check("b"), RateDecision::Allowed { .. }));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_expired_windows_are_pruned() {
        let (limiter, clock) = limiter(1, 60);

        for i in 0..=PRUNE_THRESHOLD {
            limiter.check(&format!("10.0.{}.{}", i / 256, i % 256));
        }
        clock.advance(Duration::from_secs(61));
        limiter.check("fresh");

        assert_eq!(limiter.tracked_keys(), 1);
    }
}
