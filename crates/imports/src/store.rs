//! Import job and idempotency record stores.

use std::collections::HashMap;
use std::sync::RwLock;

use lingora_core::{JobId, UserId};
use lingora_infra::StoreError;

use crate::job::{IdempotencyRecord, ImportJob};

/// Durable job records. The store, not the queue, is the source of truth
/// for job state.
pub trait ImportJobStore: Send + Sync {
    /// Insert a new job record; duplicate ids fail with
    /// [`StoreError::Duplicate`].
    fn insert(&self, job: ImportJob) -> Result<(), StoreError>;

    fn get(&self, job_id: JobId) -> Result<Option<ImportJob>, StoreError>;

    /// Overwrite an existing record; [`StoreError::NotFound`] if absent.
    fn update(&self, job: &ImportJob) -> Result<(), StoreError>;

    /// A user's jobs newest-first, plus the total count before paging.
    fn list_for_user(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ImportJob>, usize), StoreError>;

    /// Erase every job belonging to a user; returns the number removed.
    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError>;
}

/// Scoped idempotency key claims. Insert is the claim: exactly one caller
/// wins a key, everyone else gets [`StoreError::Duplicate`] and re-reads.
pub trait IdempotencyStore: Send + Sync {
    fn insert(&self, record: IdempotencyRecord) -> Result<(), StoreError>;

    fn get(&self, scoped_key: &str) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Release a single claim; `Ok(false)` when the key was not held.
    fn delete(&self, scoped_key: &str) -> Result<bool, StoreError>;

    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError>;
}

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryImportJobStore {
    jobs: RwLock<HashMap<JobId, ImportJob>>,
}

impl InMemoryImportJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImportJobStore for InMemoryImportJobStore {
    fn insert(&self, job: ImportJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id.to_string()));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<Option<ImportJob>, StoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        Ok(jobs.get(&job_id).cloned())
    }

    fn update(&self, job: &ImportJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(job.id.to_string())),
        }
    }

    fn list_for_user(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ImportJob>, usize), StoreError> {
        let jobs = self.jobs.read().map_err(|_| poisoned())?;
        let mut mine: Vec<ImportJob> = jobs
            .values()
            .filter(|job| job.user_id == *user_id)
            .cloned()
            .collect();
        // Newest first; id is a tiebreak for records created in the same
        // instant.
        mine.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        let total = mine.len();
        let page = mine.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let before = jobs.len();
        jobs.retain(|_, job| job.user_id != *user_id);
        Ok(before - jobs.len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn insert(&self, record: IdempotencyRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&record.scoped_key) {
            return Err(StoreError::Duplicate(record.scoped_key));
        }
        records.insert(record.scoped_key.clone(), record);
        Ok(())
    }

    fn get(&self, scoped_key: &str) -> Result<Option<IdempotencyRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(scoped_key).cloned())
    }

    fn delete(&self, scoped_key: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.remove(scoped_key).is_some())
    }

    fn delete_for_user(&self, user_id: &UserId) -> Result<usize, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let prefix = format!("{user_id}:");
        let before = records.len();
        records.retain(|key, _| !key.starts_with(&prefix));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Channel, scope_idempotency_key};
    use chrono::Utc;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn job_for(user: &str) -> ImportJob {
        ImportJob::new(uid(user), Channel::Daily, "palabra")
    }

    #[test]
    fn insert_is_unique_by_id() {
        let store = InMemoryImportJobStore::new();
        let job = job_for("alice");
        store.insert(job.clone()).unwrap();
        assert!(matches!(
            store.insert(job),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn update_requires_existing_record() {
        let store = InMemoryImportJobStore::new();
        let mut job = job_for("alice");
        assert!(matches!(
            store.update(&job),
            Err(StoreError::NotFound(_))
        ));
        store.insert(job.clone()).unwrap();
        job.advance_progress();
        store.update(&job).unwrap();
        assert_eq!(store.get(job.id).unwrap().unwrap().progress, 25);
    }

    #[test]
    fn list_is_newest_first_and_paged() {
        let store = InMemoryImportJobStore::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = job_for("alice");
            ids.push(job.id);
            store.insert(job).unwrap();
        }
        store.insert(job_for("bob_1")).unwrap();

        let (page, total) = store.list_for_user(&uid("alice"), 0, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        // now_v7 ids are time-ordered, so the newest insert sorts first.
        assert_eq!(page[0].id, ids[4]);
        assert_eq!(page[1].id, ids[3]);

        let (rest, _) = store.list_for_user(&uid("alice"), 4, 10).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ids[0]);
    }

    #[test]
    fn delete_for_user_only_touches_their_jobs() {
        let store = InMemoryImportJobStore::new();
        store.insert(job_for("alice")).unwrap();
        store.insert(job_for("alice")).unwrap();
        let bob_job = job_for("bob_1");
        store.insert(bob_job.clone()).unwrap();

        assert_eq!(store.delete_for_user(&uid("alice")).unwrap(), 2);
        assert!(store.get(bob_job.id).unwrap().is_some());
    }

    #[test]
    fn idempotency_claim_is_first_writer_wins() {
        let store = InMemoryIdempotencyStore::new();
        let key = scope_idempotency_key(&uid("alice"), "k1");
        let winner = IdempotencyRecord {
            scoped_key: key.clone(),
            job_id: JobId::new(),
            created_at: Utc::now(),
        };
        store.insert(winner.clone()).unwrap();

        let loser = IdempotencyRecord {
            scoped_key: key.clone(),
            job_id: JobId::new(),
            created_at: Utc::now(),
        };
        assert!(matches!(store.insert(loser), Err(StoreError::Duplicate(_))));
        assert_eq!(store.get(&key).unwrap().unwrap().job_id, winner.job_id);
    }

    #[test]
    fn released_key_can_be_claimed_again() {
        let store = InMemoryIdempotencyStore::new();
        let key = scope_idempotency_key(&uid("alice"), "k1");
        store
            .insert(IdempotencyRecord {
                scoped_key: key.clone(),
                job_id: JobId::new(),
                created_at: Utc::now(),
            })
            .unwrap();

        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
        store
            .insert(IdempotencyRecord {
                scoped_key: key.clone(),
                job_id: JobId::new(),
                created_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn idempotency_erasure_is_prefix_scoped() {
        let store = InMemoryIdempotencyStore::new();
        for (user, key) in [("alice", "k1"), ("alice", "k2"), ("bob_1", "k1")] {
            store
                .insert(IdempotencyRecord {
                    scoped_key: scope_idempotency_key(&uid(user), key),
                    job_id: JobId::new(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        assert_eq!(store.delete_for_user(&uid("alice")).unwrap(), 2);
        assert!(store.get("bob_1:k1").unwrap().is_some());
    }
}
