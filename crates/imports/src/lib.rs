//! `lingora-imports` — vocabulary import jobs: records, stores, submission
//! service, and the background worker.
//!
//! The job record store is the source of truth for job state; the queue only
//! carries ids. At-least-once processing with bounded retries and a
//! dead-letter sink.

pub mod job;
pub mod service;
pub mod store;
pub mod worker;

pub use job::{Channel, IdempotencyRecord, ImportJob, ImportStatus, scope_idempotency_key};
pub use service::{CreateOutcome, ErasureReport, ImportError, ImportService};
pub use store::{IdempotencyStore, ImportJobStore, InMemoryIdempotencyStore, InMemoryImportJobStore};
pub use worker::{ProcessOutcome, Worker, WorkerConfig, WorkerHandle};
