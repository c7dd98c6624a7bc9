//! Request middleware: bearer auth and request metrics.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use lingora_auth::{TokenIssuer, TokenType};
use lingora_core::UserId;
use lingora_infra::RevocationStore;
use lingora_observability::MetricsRegistry;

use crate::context::AuthContext;

#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<TokenIssuer>,
    pub revocations: Arc<dyn RevocationStore>,
}

/// Verify the bearer access token and attach an [`AuthContext`].
///
/// Every failure mode collapses into a bare 401: callers learn nothing about
/// whether a token was absent, malformed, expired, or revoked.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .issuer
        .verify(token, TokenType::Access)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let revoked = state
        .revocations
        .is_revoked(&claims.jti)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    if revoked {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = UserId::parse(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;
    req.extensions_mut()
        .insert(AuthContext::new(user_id, claims.jti));

    Ok(next.run(req).await)
}

/// Record latency and status class for every request.
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(req).await;
    metrics.record_request(
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0,
    );
    response
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
