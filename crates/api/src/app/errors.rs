use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use lingora_core::DomainError;
use lingora_imports::{Channel, ImportError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map service errors onto the wire taxonomy. Backend failures are logged
/// and collapsed into a generic 500.
pub fn import_error_to_response(err: ImportError) -> axum::response::Response {
    match err {
        ImportError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        ImportError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        ImportError::Domain(DomainError::NotFound) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "not found")
        }
        ImportError::Domain(DomainError::Unauthorized) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden")
        }
        ImportError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            internal_error()
        }
        ImportError::Queue(e) => {
            tracing::error!(error = %e, "queue failure");
            internal_error()
        }
    }
}

pub fn internal_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error",
    )
}

pub fn unauthorized() -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication failed")
}

pub fn parse_channel(s: &str) -> Result<Channel, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "daily" => Ok(Channel::Daily),
        "business" => Ok(Channel::Business),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_channel",
            "channel must be one of: daily, business",
        )),
    }
}
