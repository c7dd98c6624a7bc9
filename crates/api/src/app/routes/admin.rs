//! Admin operations: queue health, worker tick, ledger cleanup, metrics.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use crate::app::dto::TickQuery;
use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

const DEFAULT_TICK_JOBS: usize = 10;
const MAX_TICK_JOBS: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/queues/metrics", get(queue_metrics))
        .route("/worker/tick", post(worker_tick))
        .route("/tokens/cleanup", post(tokens_cleanup))
        .route("/observability/metrics", get(observability_metrics))
}

fn require_admin(services: &AppServices, ctx: &AuthContext) -> Result<(), Response> {
    match services.roles.role_of(ctx.user_id()) {
        Ok(role) if role.is_admin() => Ok(()),
        Ok(_) => Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin role required",
        )),
        Err(error) => {
            tracing::error!(%error, "role lookup failed");
            Err(errors::internal_error())
        }
    }
}

pub async fn queue_metrics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    if let Err(response) = require_admin(&services, &ctx) {
        return response;
    }

    let metrics = match services.queue.metrics() {
        Ok(metrics) => metrics,
        Err(error) => {
            tracing::error!(%error, "queue metrics failed");
            return errors::internal_error();
        }
    };

    let threshold = services.config.queue_depth_alert_threshold;
    let alert_triggered = metrics.main_depth > threshold;
    if alert_triggered {
        tracing::warn!(depth = metrics.main_depth, threshold, "import queue backlog");
        services.alerts.queue_depth_alert(metrics.main_depth, threshold);
    }

    Json(serde_json::json!({
        "main_depth": metrics.main_depth,
        "dlq_depth": metrics.dlq_depth,
        "oldest_job_age_seconds": metrics.oldest_job_age_seconds,
        "alert_triggered": alert_triggered,
    }))
    .into_response()
}

/// Drive the worker a bounded number of steps without a background thread.
/// Retry backoff can block, so the batch runs off the async runtime.
pub async fn worker_tick(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<TickQuery>,
) -> Response {
    if let Err(response) = require_admin(&services, &ctx) {
        return response;
    }

    let max_jobs = query.max_jobs.unwrap_or(DEFAULT_TICK_JOBS).min(MAX_TICK_JOBS);
    let worker = services.worker.clone();
    let result = tokio::task::spawn_blocking(move || worker.process_batch(max_jobs)).await;

    match result {
        Ok(Ok(processed)) => {
            Json(serde_json::json!({ "processed_job_ids": processed })).into_response()
        }
        Ok(Err(error)) => {
            tracing::error!(%error, "worker tick failed");
            errors::internal_error()
        }
        Err(error) => {
            tracing::error!(%error, "worker tick panicked");
            errors::internal_error()
        }
    }
}

pub async fn tokens_cleanup(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    if let Err(response) = require_admin(&services, &ctx) {
        return response;
    }

    match services.revocations.purge_expired(Utc::now()) {
        Ok(purged) => Json(serde_json::json!({ "purged": purged })).into_response(),
        Err(error) => {
            tracing::error!(%error, "revocation cleanup failed");
            errors::internal_error()
        }
    }
}

pub async fn observability_metrics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    if let Err(response) = require_admin(&services, &ctx) {
        return response;
    }

    Json(services.metrics.snapshot()).into_response()
}
