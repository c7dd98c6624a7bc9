//! Job queue abstraction: FIFO main queue plus an append-only dead-letter
//! sink.
//!
//! The queue carries `JobId` references only; the durable job record is the
//! source of truth for job state. Enqueue-time bookkeeping (for the age
//! metric) is owned by the backend and removed on dequeue.

use thiserror::Error;

use lingora_core::JobId;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryQueue;
#[cfg(feature = "redis")]
pub use redis::RedisQueue;

/// Queue backend error (connectivity, protocol). The in-memory backend is
/// infallible but shares the signature so backends stay interchangeable.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Ephemeral, derived snapshot of queue health. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueMetrics {
    pub main_depth: usize,
    pub dlq_depth: usize,
    /// Age of the oldest still-pending main-queue entry; 0 when empty.
    pub oldest_job_age_seconds: u64,
}

/// Queue contract shared by both backends.
///
/// `dequeue` is non-blocking: callers poll. FIFO order holds for the main
/// queue; the DLQ is an append-only sink with no ordering guarantee.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job_id: JobId) -> Result<(), QueueError>;

    /// Pop the oldest pending job id, or `None` when empty.
    fn dequeue(&self) -> Result<Option<JobId>, QueueError>;

    fn enqueue_dead_letter(&self, job_id: JobId) -> Result<(), QueueError>;

    fn metrics(&self) -> Result<QueueMetrics, QueueError>;
}
