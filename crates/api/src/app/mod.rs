//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service graph (stores, queue, limiter, worker, metrics)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: AppConfig) -> Router {
    router_with(Arc::new(build_services(config)))
}

/// Router over an already-built service graph; tests use this to keep a
/// handle on the services behind the server.
pub fn router_with(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        issuer: services.issuer.clone(),
        revocations: services.revocations.clone(),
    };

    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    services.metrics.clone(),
                    middleware::metrics_middleware,
                ))
                .layer(Extension(services.clone())),
        )
}
