//! Background import worker: retry, backoff, dead-lettering.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use lingora_core::JobId;
use lingora_infra::{AlertClient, JobQueue, QueueError, StoreError};
use lingora_observability::MetricsRegistry;

use crate::job::ImportJob;
use crate::store::ImportJobStore;

/// One processing cycle over a job. `Err` carries the failure message that
/// lands in `last_error`.
pub type ProcessStep = Box<dyn Fn(&ImportJob) -> Result<(), String> + Send + Sync>;

/// Content flagged with this marker fails the default step; used to exercise
/// the retry path end to end.
const FORCE_FAIL_MARKER: &str = "FORCE_FAIL";

const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one `process_next_job` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Advanced and re-queued.
    Progressed,
    Completed,
    /// Failed this cycle; re-queued for another attempt.
    Retried,
    DeadLettered,
    /// Queue entry with no record behind it; dropped.
    Missing,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_retries: u32,
    pub backoff_base_seconds: u64,
    /// Idle sleep between polls in `run_forever`.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_seconds: 2,
            poll_interval: Duration::from_millis(200),
        }
    }
}

/// Handle to a worker running on its own thread.
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the thread to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub struct Worker {
    queue: Arc<dyn JobQueue>,
    jobs: Arc<dyn ImportJobStore>,
    alerts: AlertClient,
    metrics: Arc<MetricsRegistry>,
    config: WorkerConfig,
    step: ProcessStep,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        jobs: Arc<dyn ImportJobStore>,
        alerts: AlertClient,
        metrics: Arc<MetricsRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            jobs,
            alerts,
            metrics,
            config,
            step: Box::new(default_step),
        }
    }

    /// Replace the processing step (tests, alternative pipelines).
    pub fn with_step(mut self, step: ProcessStep) -> Self {
        self.step = step;
        self
    }

    /// Dequeue and process one job. `Ok(None)` when the queue is empty;
    /// otherwise the processed id and what happened to it.
    pub fn process_next_job(&self) -> Result<Option<(JobId, ProcessOutcome)>, WorkerError> {
        let Some(job_id) = self.queue.dequeue()? else {
            return Ok(None);
        };
        let Some(mut job) = self.jobs.get(job_id)? else {
            // Record erased after enqueue; nothing to do.
            debug!(job_id = %job_id, "dequeued id has no job record, dropping");
            return Ok(Some((job_id, ProcessOutcome::Missing)));
        };

        job.mark_processing();
        self.jobs.update(&job)?;

        let started = Instant::now();
        let result = (self.step)(&job);
        self.metrics
            .record_worker_duration(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => {
                let completed = job.advance_progress();
                self.jobs.update(&job)?;
                if completed {
                    info!(job_id = %job.id, "import completed");
                    Ok(Some((job.id, ProcessOutcome::Completed)))
                } else {
                    self.queue.enqueue(job.id)?;
                    debug!(job_id = %job.id, progress = job.progress, "import progressed");
                    Ok(Some((job.id, ProcessOutcome::Progressed)))
                }
            }
            Err(reason) => {
                let exhausted = job.record_failure(&reason, self.config.max_retries);
                self.jobs.update(&job)?;
                if exhausted {
                    self.queue.enqueue_dead_letter(job.id)?;
                    error!(job_id = %job.id, attempts = job.attempts, error = %reason, "import dead-lettered");
                    self.alerts.notify(&format!(
                        "import job {} dead-lettered after {} attempts: {reason}",
                        job.id, job.attempts
                    ));
                    Ok(Some((job.id, ProcessOutcome::DeadLettered)))
                } else {
                    // Backoff blocks this worker only; the queue stays open.
                    thread::sleep(self.backoff(job.attempts));
                    self.queue.enqueue(job.id)?;
                    warn!(job_id = %job.id, attempts = job.attempts, error = %reason, "import retried");
                    Ok(Some((job.id, ProcessOutcome::Retried)))
                }
            }
        }
    }

    /// Drain up to `max_jobs` entries; returns the processed job ids in
    /// order. Queue entries with no record behind them are dropped and do
    /// not count against the budget.
    pub fn process_batch(&self, max_jobs: usize) -> Result<Vec<JobId>, WorkerError> {
        let mut processed = Vec::new();
        while processed.len() < max_jobs {
            match self.process_next_job()? {
                Some((_, ProcessOutcome::Missing)) => {}
                Some((job_id, _)) => processed.push(job_id),
                None => break,
            }
        }
        Ok(processed)
    }

    /// Poll until a shutdown signal arrives. Queue and store errors are
    /// logged and retried after the poll interval.
    pub fn run_forever(&self, shutdown: mpsc::Receiver<()>) {
        info!("import worker started");
        loop {
            if shutdown.try_recv().is_ok() {
                break;
            }
            match self.process_next_job() {
                Ok(Some(_)) => {}
                Ok(None) => thread::sleep(self.config.poll_interval),
                Err(e) => {
                    error!(error = %e, "worker cycle failed");
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
        info!("import worker stopped");
    }

    /// Run the worker on a dedicated thread.
    pub fn spawn(self) -> Result<WorkerHandle, std::io::Error> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name("import-worker".to_string())
            .spawn(move || self.run_forever(shutdown_rx))?;
        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    fn backoff(&self, attempts: u32) -> Duration {
        let seconds = self
            .config
            .backoff_base_seconds
            .saturating_pow(attempts.min(8));
        Duration::from_secs(seconds).min(MAX_BACKOFF)
    }
}

/// Default processing cycle: simulated translation work that fails only on
/// content carrying the forced-failure marker.
fn default_step(job: &ImportJob) -> Result<(), String> {
    if job.content_preview.contains(FORCE_FAIL_MARKER) {
        return Err("forced failure marker present".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Channel, ImportStatus};
    use crate::store::InMemoryImportJobStore;
    use lingora_core::{JobId, UserId};
    use lingora_infra::InMemoryQueue;

    fn fixture() -> (Worker, Arc<InMemoryQueue>, Arc<InMemoryImportJobStore>) {
        let queue = Arc::new(InMemoryQueue::new());
        let jobs = Arc::new(InMemoryImportJobStore::new());
        let worker = Worker::new(
            queue.clone(),
            jobs.clone(),
            AlertClient::disabled(),
            Arc::new(MetricsRegistry::new()),
            WorkerConfig {
                max_retries: 3,
                backoff_base_seconds: 0,
                poll_interval: Duration::from_millis(1),
            },
        );
        (worker, queue, jobs)
    }

    fn submit(queue: &InMemoryQueue, jobs: &InMemoryImportJobStore, content: &str) -> JobId {
        let job = ImportJob::new(UserId::parse("alice").unwrap(), Channel::Daily, content);
        let id = job.id;
        jobs.insert(job).unwrap();
        queue.enqueue(id).unwrap();
        id
    }

    #[test]
    fn empty_queue_yields_none() {
        let (worker, _, _) = fixture();
        assert_eq!(worker.process_next_job().unwrap(), None);
    }

    #[test]
    fn job_completes_after_four_cycles() {
        let (worker, queue, jobs) = fixture();
        let id = submit(&queue, &jobs, "hola mundo");

        for expected in [
            ProcessOutcome::Progressed,
            ProcessOutcome::Progressed,
            ProcessOutcome::Progressed,
            ProcessOutcome::Completed,
        ] {
            assert_eq!(worker.process_next_job().unwrap(), Some((id, expected)));
        }

        let job = jobs.get(id).unwrap().unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(queue.dequeue().unwrap(), None);
    }

    #[test]
    fn forced_failure_dead_letters_after_max_retries() {
        let (worker, queue, jobs) = fixture();
        let id = submit(&queue, &jobs, "FORCE_FAIL this import");

        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((id, ProcessOutcome::Retried))
        );
        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((id, ProcessOutcome::Retried))
        );
        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((id, ProcessOutcome::DeadLettered))
        );

        let job = jobs.get(id).unwrap().unwrap();
        assert_eq!(job.status, ImportStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert!(job.last_error.is_some());

        let metrics = queue.metrics().unwrap();
        assert_eq!(metrics.main_depth, 0);
        assert_eq!(metrics.dlq_depth, 1);
    }

    #[test]
    fn missing_record_is_dropped_silently() {
        let (worker, queue, _) = fixture();
        let orphan = JobId::new();
        queue.enqueue(orphan).unwrap();
        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((orphan, ProcessOutcome::Missing))
        );
        assert_eq!(worker.process_next_job().unwrap(), None);
    }

    #[test]
    fn batch_reports_processed_ids_in_order() {
        let (worker, queue, jobs) = fixture();
        let first = submit(&queue, &jobs, "uno");
        let second = submit(&queue, &jobs, "dos");

        assert_eq!(worker.process_batch(1).unwrap(), vec![first]);
        // Two queued entries remain (the re-queued first job plus the
        // second), then each job needs three more cycles.
        let rest = worker.process_batch(100).unwrap();
        assert_eq!(rest.len(), 7);
        assert_eq!(rest[0], second);
        assert_eq!(rest[1], first);
        assert!(worker.process_batch(100).unwrap().is_empty());
    }

    #[test]
    fn batch_on_empty_queue_is_a_no_op() {
        let (worker, _, _) = fixture();
        assert!(worker.process_batch(10).unwrap().is_empty());
    }

    #[test]
    fn orphaned_entries_do_not_count_as_processed() {
        let (worker, queue, jobs) = fixture();
        queue.enqueue(JobId::new()).unwrap();
        let real = submit(&queue, &jobs, "hola");

        assert_eq!(worker.process_batch(1).unwrap(), vec![real]);
    }

    #[test]
    fn success_cycle_clears_error_from_earlier_attempt() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let (worker, queue, jobs) = fixture();
        let failed_once = Arc::new(AtomicBool::new(false));
        let flag = failed_once.clone();
        let worker = worker.with_step(Box::new(move |_| {
            if flag.swap(true, Ordering::SeqCst) {
                Ok(())
            } else {
                Err("transient outage".to_string())
            }
        }));
        let id = submit(&queue, &jobs, "hola");

        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((id, ProcessOutcome::Retried))
        );
        assert_eq!(
            jobs.get(id).unwrap().unwrap().last_error.as_deref(),
            Some("transient outage")
        );

        assert_eq!(
            worker.process_next_job().unwrap(),
            Some((id, ProcessOutcome::Progressed))
        );
        let job = jobs.get(id).unwrap().unwrap();
        assert_eq!(job.last_error, None);
        assert_eq!(job.progress, 25);
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn injected_step_drives_outcomes() {
        let (worker, queue, jobs) = fixture();
        let worker = worker.with_step(Box::new(|_| Err("always down".to_string())));
        let id = submit(&queue, &jobs, "hola");

        worker.process_next_job().unwrap();
        let job = jobs.get(id).unwrap().unwrap();
        assert_eq!(job.attempts, 1);
        assert_eq!(job.last_error.as_deref(), Some("always down"));
        assert_eq!(job.status, ImportStatus::Queued);
    }

    #[test]
    fn spawned_worker_drains_queue_and_shuts_down() {
        let (worker, queue, jobs) = fixture();
        let id = submit(&queue, &jobs, "hola");

        let handle = worker.spawn().unwrap();
        // Four cycles at a 1ms poll interval finish well inside a second.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let done = jobs
                .get(id)
                .unwrap()
                .is_some_and(|job| job.status == ImportStatus::Completed);
            if done || Instant::now() > deadline {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        handle.shutdown();

        assert_eq!(jobs.get(id).unwrap().unwrap().status, ImportStatus::Completed);
        assert_eq!(queue.dequeue().unwrap(), None);
    }

    #[test]
    fn backoff_is_capped() {
        let (worker, _, _) = fixture();
        assert_eq!(worker.backoff(1), Duration::from_secs(0));

        let (mut slow, _, _) = fixture();
        slow.config.backoff_base_seconds = 2;
        assert_eq!(slow.backoff(1), Duration::from_secs(2));
        assert_eq!(slow.backoff(2), Duration::from_secs(4));
        assert_eq!(slow.backoff(3), Duration::from_secs(5));
        assert_eq!(slow.backoff(30), Duration::from_secs(5));
    }
}
