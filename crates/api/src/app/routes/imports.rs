//! Import submission and job reads.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use lingora_core::JobId;

use crate::app::dto::{ImportRequest, PageQuery, job_json};
use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

pub async fn create_import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    headers: HeaderMap,
    Json(req): Json<ImportRequest>,
) -> Response {
    match services.rate_limiter.allow(ctx.user_id().as_str()) {
        Ok(true) => {}
        Ok(false) => {
            return errors::json_error(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "too many requests",
            );
        }
        Err(error) => {
            tracing::error!(%error, "rate limiter failure");
            return errors::internal_error();
        }
    }

    let channel = match errors::parse_channel(&req.channel) {
        Ok(channel) => channel,
        Err(response) => return response,
    };

    let header_key = headers
        .get("Idempotency-Key")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());
    let idempotency_key = header_key.or(req.idempotency_key.as_deref());

    match services
        .imports
        .create_import(ctx.user_id(), channel, &req.content, idempotency_key)
    {
        Ok(outcome) => {
            let status = if outcome.replayed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            let mut body = job_json(&outcome.job);
            body["replayed"] = json!(outcome.replayed);
            (status, Json(body)).into_response()
        }
        Err(err) => errors::import_error_to_response(err),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match JobId::parse(&job_id) {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()),
    };

    match services.imports.get_job(ctx.user_id(), job_id) {
        Ok(job) => Json(job_json(&job)).into_response(),
        Err(err) => errors::import_error_to_response(err),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Query(page): Query<PageQuery>,
) -> Response {
    let offset = page.offset.unwrap_or(0);
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    match services.imports.list_jobs(ctx.user_id(), offset, limit) {
        Ok((jobs, total)) => Json(json!({
            "jobs": jobs.iter().map(job_json).collect::<Vec<_>>(),
            "total": total,
            "offset": offset,
            "limit": limit,
        }))
        .into_response(),
        Err(err) => errors::import_error_to_response(err),
    }
}
