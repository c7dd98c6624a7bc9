use serde::Deserialize;
use serde_json::{Value, json};

use lingora_imports::ImportJob;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub channel: String,
    pub content: String,
    /// Alternative to the `Idempotency-Key` header; the header wins when
    /// both are present.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TickQuery {
    pub max_jobs: Option<usize>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn job_json(job: &ImportJob) -> Value {
    json!({
        "job_id": job.id.to_string(),
        "user_id": job.user_id.to_string(),
        "channel": job.channel.as_str(),
        "status": job.status,
        "progress": job.progress,
        "attempts": job.attempts,
        "last_error": job.last_error,
        "content_sha256": job.content_sha256,
        "content_preview": job.content_preview,
        "created_at": job.created_at.to_rfc3339(),
        "updated_at": job.updated_at.to_rfc3339(),
    })
}
