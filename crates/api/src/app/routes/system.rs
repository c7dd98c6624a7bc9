//! Liveness, readiness, identity echo, and account erasure.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Ready when the queue backend answers; with Redis selected this is a real
/// round trip.
pub async fn ready(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.queue.metrics() {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(error) => {
            tracing::error!(%error, "readiness probe failed");
            errors::json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "not_ready",
                "queue backend unavailable",
            )
        }
    }
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    let role = match services.roles.role_of(ctx.user_id()) {
        Ok(role) => role,
        Err(error) => {
            tracing::error!(%error, "role lookup failed");
            return errors::internal_error();
        }
    };
    Json(json!({
        "user_id": ctx.user_id().to_string(),
        "role": role.as_str(),
    }))
    .into_response()
}

/// Full account erasure: import jobs, idempotency claims, revocation ledger
/// entries, role grant, credential. The access token stays valid until it
/// expires; there is simply nothing left behind it.
pub async fn delete_my_data(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
) -> Response {
    let user_id = ctx.user_id();

    let report = match services.imports.delete_user_data(user_id) {
        Ok(report) => report,
        Err(err) => return errors::import_error_to_response(err),
    };

    let remaining = services
        .revocations
        .delete_for_user(user_id)
        .map(|_| ())
        .and_then(|_| services.roles.delete_for_user(user_id).map(|_| ()))
        .and_then(|_| services.credentials.delete_for_user(user_id).map(|_| ()));
    if let Err(error) = remaining {
        tracing::error!(%error, user_id = %user_id, "erasure partially failed");
        return errors::internal_error();
    }

    tracing::info!(
        user_id = %user_id,
        jobs_deleted = report.jobs_deleted,
        idempotency_records_deleted = report.idempotency_records_deleted,
        "account data erased"
    );
    StatusCode::NO_CONTENT.into_response()
}
