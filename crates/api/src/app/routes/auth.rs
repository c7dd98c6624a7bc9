//! Token lifecycle routes: signup, login, refresh rotation, logout.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use lingora_auth::{RevokedToken, TokenType, hash_password, validate_password_complexity,
    verify_password};
use lingora_core::UserId;
use lingora_infra::{Credential, StoreError};

use crate::app::dto::{LoginRequest, LogoutRequest, RefreshRequest, SignupRequest};
use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<SignupRequest>,
) -> Response {
    if !services.config.allow_self_registration {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "self_registration_disabled",
            "self registration is disabled",
        );
    }

    let user_id = match UserId::parse(&req.user_id) {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    if let Err(e) = validate_password_complexity(&req.password) {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string());
    }

    let password_hash = hash_password(&req.password);

    match services.credentials.insert(Credential {
        user_id: user_id.clone(),
        password_hash,
        created_at: Utc::now(),
    }) {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return errors::json_error(StatusCode::CONFLICT, "conflict", "user already exists");
        }
        Err(error) => {
            tracing::error!(%error, "credential insert failed");
            return errors::internal_error();
        }
    }

    match services.issuer.issue_pair(&user_id) {
        Ok(pair) => {
            tracing::info!(user_id = %user_id, "user registered");
            (StatusCode::CREATED, Json(pair)).into_response()
        }
        Err(error) => {
            tracing::error!(%error, "token issuance failed");
            errors::internal_error()
        }
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    // Every failure path is the same generic 401 so callers cannot probe
    // which accounts exist.
    let Ok(user_id) = UserId::parse(&req.user_id) else {
        return errors::unauthorized();
    };

    let credential = match services.credentials.get(&user_id) {
        Ok(Some(credential)) => credential,
        Ok(None) => return errors::unauthorized(),
        Err(error) => {
            tracing::error!(%error, "credential lookup failed");
            return errors::internal_error();
        }
    };

    if !verify_password(&req.password, &credential.password_hash) {
        return errors::unauthorized();
    }

    match services.issuer.issue_pair(&user_id) {
        Ok(pair) => Json(pair).into_response(),
        Err(error) => {
            tracing::error!(%error, "token issuance failed");
            errors::internal_error()
        }
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<RefreshRequest>,
) -> Response {
    let Ok(claims) = services.issuer.verify(&req.refresh_token, TokenType::Refresh) else {
        return errors::unauthorized();
    };

    match services.revocations.is_revoked(&claims.jti) {
        Ok(false) => {}
        Ok(true) => {
            // A consumed refresh token came back; likely replay or theft.
            services.metrics.record_refresh_revoke_hit();
            tracing::warn!(jti = %claims.jti, sub = %claims.sub, "revoked refresh token presented");
            return errors::unauthorized();
        }
        Err(error) => {
            tracing::error!(%error, "revocation lookup failed");
            return errors::internal_error();
        }
    }

    let Ok(user_id) = UserId::parse(&claims.sub) else {
        return errors::unauthorized();
    };

    // Rotation: the consumed token is revoked before the new pair exists,
    // so it can never be replayed once this request succeeds.
    if let Err(error) = services
        .revocations
        .revoke(RevokedToken::from_claims(&claims, user_id.clone()))
    {
        tracing::error!(%error, "revocation insert failed");
        return errors::internal_error();
    }

    match services.issuer.issue_pair(&user_id) {
        Ok(pair) => Json(pair).into_response(),
        Err(error) => {
            tracing::error!(%error, "token issuance failed");
            errors::internal_error()
        }
    }
}

/// Requires a valid access token (the route sits behind the auth
/// middleware) plus the refresh token to retire in the body.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<LogoutRequest>,
) -> Response {
    let Ok(claims) = services.issuer.verify(&req.refresh_token, TokenType::Refresh) else {
        return errors::unauthorized();
    };
    let Ok(user_id) = UserId::parse(&claims.sub) else {
        return errors::unauthorized();
    };

    tracing::info!(user_id = %ctx.user_id(), jti = %claims.jti, "refresh token retired on logout");

    if let Err(error) = services
        .revocations
        .revoke(RevokedToken::from_claims(&claims, user_id))
    {
        tracing::error!(%error, "revocation insert failed");
        return errors::internal_error();
    }

    StatusCode::NO_CONTENT.into_response()
}
