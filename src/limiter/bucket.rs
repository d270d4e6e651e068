//! Token bucket state for a single identity or route key.

use crate::limiter::policy::Policy;

/// Cost of one admitted request.
const REQUEST_COST: f64 = 1.0;

/// Current quota for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    tokens: f64,
    last_refill: i64,
}

impl Bucket {
    /// A fresh bucket starts full.
    pub fn new(capacity: f64, now: i64) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Milliseconds since the epoch of the last refill.
    pub fn last_refill(&self) -> i64 {
        self.last_refill
    }

    /// Credit tokens for the time elapsed since the last refill, capped at
    /// capacity. A clock that moved backwards credits nothing.
    pub fn refill(&mut self, now: i64, policy: &Policy) {
        let elapsed = now.saturating_sub(self.last_refill).max(0) as f64;
        self.tokens = (self.tokens + elapsed * policy.rate_per_ms()).min(policy.capacity());
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Refill, then take one token if available.
    pub fn try_acquire(&mut self, now: i64, policy: &Policy) -> bool {
        self.refill(now, policy);

        if self.tokens < REQUEST_COST {
            return false;
        }

        self.tokens -= REQUEST_COST;
        true
    }
}
