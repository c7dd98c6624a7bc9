//! In-process queue backend for tests and single-node deployments.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use lingora_core::JobId;

use super::{JobQueue, QueueError, QueueMetrics};

/// FIFO queue plus DLQ behind a single mutex. Each main-queue entry keeps
/// its enqueue instant so `metrics` can report the oldest pending age.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    main: VecDeque<(JobId, DateTime<Utc>)>,
    dlq: Vec<JobId>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, QueueError> {
        self.inner
            .lock()
            .map_err(|_| QueueError::Backend("queue mutex poisoned".to_string()))
    }
}

impl JobQueue for InMemoryQueue {
    fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        self.lock()?.main.push_back((job_id, Utc::now()));
        Ok(())
    }

    fn dequeue(&self) -> Result<Option<JobId>, QueueError> {
        Ok(self.lock()?.main.pop_front().map(|(id, _)| id))
    }

    fn enqueue_dead_letter(&self, job_id: JobId) -> Result<(), QueueError> {
        self.lock()?.dlq.push(job_id);
        Ok(())
    }

    fn metrics(&self) -> Result<QueueMetrics, QueueError> {
        let inner = self.lock()?;
        let oldest_job_age_seconds = inner
            .main
            .front()
            .map(|(_, enqueued_at)| {
                let age = Utc::now().signed_duration_since(*enqueued_at);
                age.num_seconds().max(0) as u64
            })
            .unwrap_or(0);
        Ok(QueueMetrics {
            main_depth: inner.main.len(),
            dlq_depth: inner.dlq.len(),
            oldest_job_age_seconds,
        })
    }
}
