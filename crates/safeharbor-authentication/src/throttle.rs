//! Brute-force login throttle
//!
//! Each user keeps the timestamps of its most recent login attempts, at most
//! `max_attempts` of them. When that many are retained and the oldest still
//! lies inside the window, the next attempt is refused before the password is
//! looked at.

use safeharbor_core::Timestamp;
use std::time::Duration;

/// Attempt-count throttle over a sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginThrottle {
    max_attempts: usize,
    window: Duration,
}

impl LoginThrottle {
    /// Throttle allowing `max_attempts` per `window`
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            window,
        }
    }

    /// Whether an attempt at `now` must be refused
    pub fn is_throttled(&self, attempts: &[Timestamp], now: Timestamp) -> bool {
        if attempts.len() < self.max_attempts {
            return false;
        }
        let recent = &attempts[attempts.len() - self.max_attempts..];
        recent.iter().all(|at| now.since(*at) <= self.window)
    }

    /// Append an attempt, keeping only the most recent `max_attempts`
    pub fn record(&self, attempts: &mut Vec<Timestamp>, now: Timestamp) {
        attempts.push(now);
        if attempts.len() > self.max_attempts {
            let excess = attempts.len() - self.max_attempts;
            attempts.drain(..excess);
        }
    }
}
