//! Redis fixed-window limiter for multi-node deployments.
//!
//! Counter key is `rate:{key}:{YYYYMMDDHHMM}`, so the window resets on the
//! calendar minute. The counter is incremented before the limit check, which
//! means rejected requests still advance it; that keeps the check a single
//! INCR round trip and only over-counts clients already past the limit.

use chrono::Utc;

use super::{RateLimitError, RateLimiter};

// Expiry slightly over a minute so a key never outlives its window by much.
const KEY_TTL_SECONDS: i64 = 70;

pub struct FixedWindowLimiter {
    client: redis::Client,
    per_minute: u32,
}

impl FixedWindowLimiter {
    pub fn connect(url: &str, per_minute: u32) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url)
            .map_err(|e| RateLimitError::Backend(format!("redis open failed: {e}")))?;
        Ok(Self { client, per_minute })
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> Result<bool, RateLimitError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RateLimitError::Backend(format!("redis connection failed: {e}")))?;
        let minute = Utc::now().format("%Y%m%d%H%M");
        let counter_key = format!("rate:{key}:{minute}");
        let count: u32 = redis::cmd("INCR")
            .arg(&counter_key)
            .query(&mut conn)
            .map_err(|e| RateLimitError::Backend(format!("INCR failed: {e}")))?;
        if count == 1 {
            redis::cmd("EXPIRE")
                .arg(&counter_key)
                .arg(KEY_TTL_SECONDS)
                .query::<()>(&mut conn)
                .map_err(|e| RateLimitError::Backend(format!("EXPIRE failed: {e}")))?;
        }
        Ok(count <= self.per_minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_limiter(per_minute: u32) -> Option<FixedWindowLimiter> {
        let url = std::env::var("LINGORA_TEST_REDIS_URL").ok()?;
        FixedWindowLimiter::connect(&url, per_minute).ok()
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let Some(limiter) = live_limiter(2) else {
            return;
        };
        let key = format!("test:{}", uuid::Uuid::now_v7());
        assert!(limiter.allow(&key).unwrap());
        assert!(limiter.allow(&key).unwrap());
        assert!(!limiter.allow(&key).unwrap());
    }
}
