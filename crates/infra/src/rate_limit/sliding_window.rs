//! Exact sliding-window limiter for single-node deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::{RateLimitError, RateLimiter};

const WINDOW_SECONDS: i64 = 60;

/// Per-key timestamp log over the trailing 60 seconds. Rejected requests are
/// not recorded, so a burst of rejects cannot extend a key's lockout.
pub struct SlidingWindowLimiter {
    per_minute: u32,
    hits: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Admission decision at an explicit instant. Tests drive this directly;
    /// production goes through [`RateLimiter::allow`].
    pub fn allow_at(&self, key: &str, now: DateTime<Utc>) -> Result<bool, RateLimitError> {
        let mut hits = self
            .hits
            .lock()
            .map_err(|_| RateLimitError::Backend("rate limiter mutex poisoned".to_string()))?;
        let log = hits.entry(key.to_string()).or_default();
        let cutoff = now - Duration::seconds(WINDOW_SECONDS);
        log.retain(|t| *t > cutoff);
        if log.len() >= self.per_minute as usize {
            return Ok(false);
        }
        log.push(now);
        Ok(true)
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> Result<bool, RateLimitError> {
        self.allow_at(key, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = SlidingWindowLimiter::new(2);
        let now = Utc::now();
        let outcomes = [
            limiter.allow_at("u1", now).unwrap(),
            limiter.allow_at("u1", now).unwrap(),
            limiter.allow_at("u1", now).unwrap(),
        ];
        assert_eq!(outcomes, [true, true, false]);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowLimiter::new(1);
        let now = Utc::now();
        assert!(limiter.allow_at("u1", now).unwrap());
        assert!(!limiter.allow_at("u1", now).unwrap());
        assert!(limiter.allow_at("u2", now).unwrap());
    }

    #[test]
    fn window_slides_open_after_sixty_seconds() {
        let limiter = SlidingWindowLimiter::new(1);
        let now = Utc::now();
        assert!(limiter.allow_at("u1", now).unwrap());
        assert!(!limiter.allow_at("u1", now + Duration::seconds(59)).unwrap());
        assert!(limiter.allow_at("u1", now + Duration::seconds(61)).unwrap());
    }

    #[test]
    fn rejects_do_not_extend_the_window() {
        let limiter = SlidingWindowLimiter::new(1);
        let now = Utc::now();
        assert!(limiter.allow_at("u1", now).unwrap());
        // Hammering while rejected must not push the reopen time out.
        for s in 1..60 {
            assert!(!limiter.allow_at("u1", now + Duration::seconds(s)).unwrap());
        }
        assert!(limiter.allow_at("u1", now + Duration::seconds(61)).unwrap());
    }
}
