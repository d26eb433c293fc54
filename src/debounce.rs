//! Minimum-interval gate for generation requests.
//!
//! Uses the monotonic clock so wall-clock adjustments cannot reopen or
//! stall the gate. The check and the commit are separate calls; the
//! pipeline owns the debouncer and performs both on one task, so nothing
//! can interleave between them.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True if a request at `now` would be accepted. No side effect.
    pub fn can_request(&self, now: Instant) -> bool {
        match self.last_accepted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Record `now` as the time of the last accepted request.
    pub fn commit(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }

    /// Check and commit in one step.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if !self.can_request(now) {
            return false;
        }
        self.commit(now);
        true
    }
}
