//! Redis-backed queue for multi-node deployments.
//!
//! Layout: the main queue is a list (`RPUSH` to enqueue, `LPOP` to dequeue),
//! the DLQ a second list, and a sorted set keyed `{queue}:enqueue_times`
//! holds the enqueue instant of every pending entry so the oldest age can be
//! read with a single `ZRANGE`.

use chrono::Utc;

use lingora_core::JobId;

use super::{JobQueue, QueueError, QueueMetrics};

pub struct RedisQueue {
    client: redis::Client,
    queue_key: String,
    dlq_key: String,
    times_key: String,
}

impl RedisQueue {
    pub fn connect(url: &str, queue_key: &str, dlq_key: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(url)
            .map_err(|e| QueueError::Backend(format!("redis open failed: {e}")))?;
        Ok(Self {
            client,
            queue_key: queue_key.to_string(),
            dlq_key: dlq_key.to_string(),
            times_key: format!("{queue_key}:enqueue_times"),
        })
    }

    fn conn(&self) -> Result<redis::Connection, QueueError> {
        self.client
            .get_connection()
            .map_err(|e| QueueError::Backend(format!("redis connection failed: {e}")))
    }
}

impl JobQueue for RedisQueue {
    fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        let id = job_id.to_string();
        redis::cmd("RPUSH")
            .arg(&self.queue_key)
            .arg(&id)
            .query::<()>(&mut conn)
            .map_err(|e| QueueError::Backend(format!("RPUSH failed: {e}")))?;
        redis::cmd("ZADD")
            .arg(&self.times_key)
            .arg(Utc::now().timestamp())
            .arg(&id)
            .query::<()>(&mut conn)
            .map_err(|e| QueueError::Backend(format!("ZADD failed: {e}")))?;
        Ok(())
    }

    fn dequeue(&self) -> Result<Option<JobId>, QueueError> {
        let mut conn = self.conn()?;
        let popped: Option<String> = redis::cmd("LPOP")
            .arg(&self.queue_key)
            .query(&mut conn)
            .map_err(|e| QueueError::Backend(format!("LPOP failed: {e}")))?;
        let Some(raw) = popped else {
            return Ok(None);
        };
        redis::cmd("ZREM")
            .arg(&self.times_key)
            .arg(&raw)
            .query::<()>(&mut conn)
            .map_err(|e| QueueError::Backend(format!("ZREM failed: {e}")))?;
        let job_id = JobId::parse(&raw)
            .map_err(|e| QueueError::Backend(format!("malformed queue entry: {e}")))?;
        Ok(Some(job_id))
    }

    fn enqueue_dead_letter(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut conn = self.conn()?;
        redis::cmd("RPUSH")
            .arg(&self.dlq_key)
            .arg(job_id.to_string())
            .query::<()>(&mut conn)
            .map_err(|e| QueueError::Backend(format!("RPUSH failed: {e}")))?;
        Ok(())
    }

    fn metrics(&self) -> Result<QueueMetrics, QueueError> {
        let mut conn = self.conn()?;
        let main_depth: usize = redis::cmd("LLEN")
            .arg(&self.queue_key)
            .query(&mut conn)
            .map_err(|e| QueueError::Backend(format!("LLEN failed: {e}")))?;
        let dlq_depth: usize = redis::cmd("LLEN")
            .arg(&self.dlq_key)
            .query(&mut conn)
            .map_err(|e| QueueError::Backend(format!("LLEN failed: {e}")))?;
        // Oldest pending entry is the lowest-scored member of the zset.
        let oldest: Vec<(String, i64)> = redis::cmd("ZRANGE")
            .arg(&self.times_key)
            .arg(0)
            .arg(0)
            .arg("WITHSCORES")
            .query(&mut conn)
            .map_err(|e| QueueError::Backend(format!("ZRANGE failed: {e}")))?;
        let oldest_job_age_seconds = oldest
            .first()
            .map(|(_, enqueued_ts)| (Utc::now().timestamp() - enqueued_ts).max(0) as u64)
            .unwrap_or(0);
        Ok(QueueMetrics {
            main_depth,
            dlq_depth,
            oldest_job_age_seconds,
        })
    }
}
