//! Per-client token-bucket rate limiting.
//!
//! Each client IP owns a bucket holding up to `burst` tokens, refilled at
//! `per_second` tokens per second. A request spends one token; a request
//! that finds the bucket empty is answered `429` before routing, without
//! running any middleware.
//!
//! ```rust
//! use gantry::{App, RateLimit};
//!
//! let mut app = App::default();
//! app.set_rate_limit(RateLimit { per_second: 10, burst: 20 });
//! ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

/// Buckets idle this long are full again and can be forgotten.
const IDLE_EVICTION: Duration = Duration::from_secs(60);

/// Bucket count above which idle buckets are evicted on insert.
const EVICTION_THRESHOLD: usize = 4096;

/// Requests per second a single client may sustain, and how many it may
/// send at once after being idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub per_second: u32,
    pub burst: u32,
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self { tokens: capacity, last_update: now }
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub(crate) struct RateLimiter {
    limit: RateLimit,
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
}

impl RateLimiter {
    pub(crate) fn new(limit: RateLimit) -> Self {
        Self { limit, buckets: Mutex::new(HashMap::new()) }
    }

    /// Spends one token from `client`'s bucket. `false` means over the limit.
    pub(crate) fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let capacity = f64::from(self.limit.burst);
        let rate = f64::from(self.limit.per_second);

        // A panic while holding the lock cannot leave a bucket half-updated.
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= EVICTION_THRESHOLD && !buckets.contains_key(&client) {
            buckets.retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_EVICTION);
        }

        let allowed = buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(capacity, now))
            .try_acquire(now, capacity, rate);

        if !allowed {
            warn!(%client, "rate limit exceeded");
        }
        allowed
    }
}
