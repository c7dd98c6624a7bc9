//! Import job and idempotency record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lingora_core::{JobId, UserId, content};

/// How far one successful processing cycle advances a job.
pub const PROGRESS_STEP: u8 = 25;
pub const PROGRESS_DONE: u8 = 100;

/// Source channel of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Daily,
    Business,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Daily => "daily",
            Channel::Business => "business",
        }
    }
}

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Waiting in the queue.
    Queued,
    /// Claimed by the worker.
    Processing,
    /// Reached full progress.
    Completed,
    /// Exhausted retries; parked in the DLQ.
    Failed,
}

impl ImportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

/// Durable import job record. Raw content is never stored: only its sha256
/// fingerprint and a masked preview survive submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: JobId,
    pub user_id: UserId,
    pub channel: Channel,
    pub status: ImportStatus,
    /// 0..=100, advanced in [`PROGRESS_STEP`] increments.
    pub progress: u8,
    /// Failed processing cycles so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub content_sha256: String,
    pub content_preview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(user_id: UserId, channel: Channel, raw_content: &str) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            user_id,
            channel,
            status: ImportStatus::Queued,
            progress: 0,
            attempts: 0,
            last_error: None,
            content_sha256: content::fingerprint_sha256(raw_content),
            content_preview: content::masked_preview(raw_content),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_processing(&mut self) {
        self.status = ImportStatus::Processing;
        self.touch();
    }

    /// Advance one cycle's worth of progress, transitioning to `Completed`
    /// at full progress. Returns whether the job finished.
    ///
    /// A successful cycle clears any error left by earlier failed attempts.
    pub fn advance_progress(&mut self) -> bool {
        self.last_error = None;
        self.progress = self.progress.saturating_add(PROGRESS_STEP).min(PROGRESS_DONE);
        if self.progress >= PROGRESS_DONE {
            self.status = ImportStatus::Completed;
        } else {
            self.status = ImportStatus::Queued;
        }
        self.touch();
        self.status == ImportStatus::Completed
    }

    /// Record a failed cycle. Terminal (`Failed`) once attempts reach
    /// `max_retries`, otherwise back to `Queued` for another try.
    pub fn record_failure(&mut self, error: impl Into<String>, max_retries: u32) -> bool {
        self.attempts += 1;
        self.last_error = Some(error.into());
        let exhausted = self.attempts >= max_retries;
        self.status = if exhausted {
            ImportStatus::Failed
        } else {
            ImportStatus::Queued
        };
        self.touch();
        exhausted
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Maps a scoped idempotency key to the job that first claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub scoped_key: String,
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
}

/// Keys are scoped per user so two users submitting the same client key can
/// never observe each other's jobs.
pub fn scope_idempotency_key(user_id: &UserId, key: &str) -> String {
    format!("{user_id}:{key}")
}
