//! Import submission and ownership-checked reads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use lingora_core::{DomainError, JobId, UserId};
use lingora_infra::{JobQueue, QueueError, StoreError};

use crate::job::{Channel, IdempotencyRecord, ImportJob, scope_idempotency_key};
use crate::store::{IdempotencyStore, ImportJobStore};

/// How often a lost claim race is retried before giving up on the key.
const CLAIM_ATTEMPTS: usize = 3;
/// How long a held key is polled for the winner's job record. Covers the
/// window between the winner claiming the key and persisting its job.
const WINNER_POLLS: usize = 5;
const WINNER_POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Result of a submission: the authoritative job record plus whether it was
/// served from an earlier claim of the same idempotency key.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub job: ImportJob,
    pub replayed: bool,
}

/// What a user-data erasure removed.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ErasureReport {
    pub jobs_deleted: usize,
    pub idempotency_records_deleted: usize,
}

pub struct ImportService {
    jobs: Arc<dyn ImportJobStore>,
    idempotency: Arc<dyn IdempotencyStore>,
    queue: Arc<dyn JobQueue>,
}

impl ImportService {
    pub fn new(
        jobs: Arc<dyn ImportJobStore>,
        idempotency: Arc<dyn IdempotencyStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            jobs,
            idempotency,
            queue,
        }
    }

    /// Submit an import. With an idempotency key, a repeat submission (or a
    /// lost race for the key) returns the winning job's current state; the
    /// key is a claim on the key alone, never on the content behind it.
    ///
    /// The job record is durably persisted before the id is enqueued, so a
    /// dequeued id always has a record behind it.
    pub fn create_import(
        &self,
        user_id: &UserId,
        channel: Channel,
        content: &str,
        idempotency_key: Option<&str>,
    ) -> Result<CreateOutcome, ImportError> {
        if content.trim().is_empty() {
            return Err(DomainError::validation("content must not be empty").into());
        }

        let job = ImportJob::new(user_id.clone(), channel, content);

        if let Some(key) = idempotency_key.map(|key| scope_idempotency_key(user_id, key))
            && let Some(existing) = self.claim_key(&key, job.id)?
        {
            return Ok(existing);
        }

        self.jobs.insert(job.clone())?;
        self.queue.enqueue(job.id)?;
        info!(job_id = %job.id, user_id = %user_id, channel = %job.channel.as_str(), "import queued");
        Ok(CreateOutcome {
            job,
            replayed: false,
        })
    }

    /// Claim a scoped key for `job_id`. `Ok(None)` means the claim is ours
    /// and the submission proceeds; `Ok(Some(_))` is the winning job of an
    /// earlier claim.
    fn claim_key(
        &self,
        scoped_key: &str,
        job_id: JobId,
    ) -> Result<Option<CreateOutcome>, ImportError> {
        for _ in 0..CLAIM_ATTEMPTS {
            let claim = IdempotencyRecord {
                scoped_key: scoped_key.to_string(),
                job_id,
                created_at: Utc::now(),
            };
            match self.idempotency.insert(claim) {
                Ok(()) => return Ok(None),
                Err(StoreError::Duplicate(_)) => {
                    if let Some(existing) = self.lookup_winner(scoped_key)? {
                        return Ok(Some(existing));
                    }
                    // The stale claim was released; try for the key again.
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(StoreError::Backend(format!("idempotency key {scoped_key} is contended")).into())
    }

    /// Resolve a held key to its job. The winner persists its job right
    /// after claiming, so a briefly missing record is polled through; a
    /// claim that never resolves (e.g. orphaned by a partial erasure) is
    /// released so the key becomes claimable again.
    fn lookup_winner(&self, scoped_key: &str) -> Result<Option<CreateOutcome>, ImportError> {
        let Some(record) = self.idempotency.get(scoped_key)? else {
            return Ok(None);
        };
        for poll in 0..WINNER_POLLS {
            if let Some(job) = self.jobs.get(record.job_id)? {
                return Ok(Some(CreateOutcome {
                    job,
                    replayed: true,
                }));
            }
            if poll + 1 < WINNER_POLLS {
                thread::sleep(WINNER_POLL_INTERVAL);
            }
        }
        warn!(scoped_key, job_id = %record.job_id, "releasing idempotency claim with no job behind it");
        self.idempotency.delete(scoped_key)?;
        Ok(None)
    }

    /// Fetch a job, visible only to its owner.
    pub fn get_job(&self, user_id: &UserId, job_id: JobId) -> Result<ImportJob, ImportError> {
        let job = self.jobs.get(job_id)?.ok_or(DomainError::NotFound)?;
        if job.user_id != *user_id {
            return Err(DomainError::Unauthorized.into());
        }
        Ok(job)
    }

    /// A user's jobs newest-first with the pre-paging total.
    pub fn list_jobs(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ImportJob>, usize), ImportError> {
        Ok(self.jobs.list_for_user(user_id, offset, limit)?)
    }

    /// Erase a user's jobs and idempotency claims.
    pub fn delete_user_data(&self, user_id: &UserId) -> Result<ErasureReport, ImportError> {
        let jobs_deleted = self.jobs.delete_for_user(user_id)?;
        let idempotency_records_deleted = self.idempotency.delete_for_user(user_id)?;
        info!(user_id = %user_id, jobs_deleted, idempotency_records_deleted, "user import data erased");
        Ok(ErasureReport {
            jobs_deleted,
            idempotency_records_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ImportStatus;
    use crate::store::{InMemoryIdempotencyStore, InMemoryImportJobStore};
    use lingora_infra::InMemoryQueue;

    fn service() -> (ImportService, Arc<InMemoryQueue>) {
        let queue = Arc::new(InMemoryQueue::new());
        let service = ImportService::new(
            Arc::new(InMemoryImportJobStore::new()),
            Arc::new(InMemoryIdempotencyStore::new()),
            queue.clone(),
        );
        (service, queue)
    }

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn submission_persists_then_enqueues() {
        let (service, queue) = service();
        let outcome = service
            .create_import(&uid("alice"), Channel::Daily, "hola", None)
            .unwrap();
        assert!(!outcome.replayed);
        assert_eq!(outcome.job.status, ImportStatus::Queued);
        assert_eq!(queue.dequeue().unwrap(), Some(outcome.job.id));
    }

    #[test]
    fn empty_content_is_rejected() {
        let (service, _) = service();
        let err = service
            .create_import(&uid("alice"), Channel::Daily, "   ", None)
            .unwrap_err();
        assert!(matches!(err, ImportError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn idempotent_replay_returns_first_job_without_requeue() {
        let (service, queue) = service();
        let first = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        let second = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();

        assert!(second.replayed);
        assert_eq!(second.job.id, first.job.id);
        assert_eq!(queue.dequeue().unwrap(), Some(first.job.id));
        assert_eq!(queue.dequeue().unwrap(), None);
    }

    #[test]
    fn replay_wins_even_when_content_differs() {
        // The key claims the key, not the content: a reused key with new
        // content still returns the original job.
        let (service, _) = service();
        let first = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        let second = service
            .create_import(&uid("alice"), Channel::Business, "adios", Some("k1"))
            .unwrap();

        assert!(second.replayed);
        assert_eq!(second.job.id, first.job.id);
        assert_eq!(second.job.content_sha256, first.job.content_sha256);
    }

    #[test]
    fn same_key_different_users_get_distinct_jobs() {
        let (service, _) = service();
        let alice = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        let bob = service
            .create_import(&uid("bob_1"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        assert!(!bob.replayed);
        assert_ne!(alice.job.id, bob.job.id);
    }

    #[test]
    fn replay_reflects_current_job_state() {
        let (service, _) = service();
        let first = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();

        let mut progressed = first.job.clone();
        progressed.advance_progress();
        service.jobs.update(&progressed).unwrap();

        let replay = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.job.progress, 25);
    }

    #[test]
    fn orphaned_claim_is_released_and_key_reused() {
        // A claim can outlive its job record (partial erasure, or a crash
        // between claim and persist). The next submission must reclaim the
        // key instead of failing forever.
        let (service, _) = service();
        service
            .idempotency
            .insert(IdempotencyRecord {
                scoped_key: scope_idempotency_key(&uid("alice"), "k1"),
                job_id: JobId::new(),
                created_at: Utc::now(),
            })
            .unwrap();

        let outcome = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        assert!(!outcome.replayed);

        let claim = service.idempotency.get("alice:k1").unwrap().unwrap();
        assert_eq!(claim.job_id, outcome.job.id);

        let replay = service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.job.id, outcome.job.id);
    }

    #[test]
    fn get_job_enforces_ownership() {
        let (service, _) = service();
        let outcome = service
            .create_import(&uid("alice"), Channel::Daily, "hola", None)
            .unwrap();

        assert!(service.get_job(&uid("alice"), outcome.job.id).is_ok());
        let err = service.get_job(&uid("bob_1"), outcome.job.id).unwrap_err();
        assert!(matches!(err, ImportError::Domain(DomainError::Unauthorized)));
        let err = service.get_job(&uid("alice"), JobId::new()).unwrap_err();
        assert!(matches!(err, ImportError::Domain(DomainError::NotFound)));
    }

    #[test]
    fn erasure_removes_jobs_and_claims_and_frees_keys() {
        let (service, _) = service();
        service
            .create_import(&uid("alice"), Channel::Daily, "hola", Some("k1"))
            .unwrap();
        service
            .create_import(&uid("alice"), Channel::Daily, "adios", None)
            .unwrap();

        let report = service.delete_user_data(&uid("alice")).unwrap();
        assert_eq!(report.jobs_deleted, 2);
        assert_eq!(report.idempotency_records_deleted, 1);

        let (jobs, total) = service.list_jobs(&uid("alice"), 0, 10).unwrap();
        assert!(jobs.is_empty());
        assert_eq!(total, 0);
    }
}
