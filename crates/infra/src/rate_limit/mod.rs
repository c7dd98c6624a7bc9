//! Per-key request rate limiting.
//!
//! Two backends with the same admit/reject surface: an in-process sliding
//! window (exact over the last 60 seconds) and a Redis fixed window keyed by
//! calendar minute. Both are advisory admission checks; neither stores
//! durable state.

use thiserror::Error;

pub mod sliding_window;
#[cfg(feature = "redis")]
pub mod fixed_window;

pub use sliding_window::SlidingWindowLimiter;
#[cfg(feature = "redis")]
pub use fixed_window::FixedWindowLimiter;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend error: {0}")]
    Backend(String),
}

/// Admission check. `Ok(true)` admits the request, `Ok(false)` rejects it
/// with the caller expected to answer 429.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> Result<bool, RateLimitError>;
}
