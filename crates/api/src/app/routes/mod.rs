use axum::{
    Router,
    routing::{delete, get, post},
};

pub mod admin;
pub mod auth;
pub mod imports;
pub mod learning;
pub mod system;

/// Routes reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/ready", get(system::ready))
        .nest("/auth", auth::router())
}

/// Routes behind the auth middleware. Logout lives here rather than under
/// the public auth router: revoking a refresh token requires proving you
/// still hold a valid access token.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/whoami", get(system::whoami))
        .route("/onboarding/calculate-plan", post(learning::calculate_plan))
        .route("/chat/analyze", post(learning::analyze_chat))
        .route("/import", post(imports::create_import))
        .route("/import/:job_id", get(imports::get_job))
        .route("/imports", get(imports::list_jobs))
        .route("/me/data", delete(system::delete_my_data))
        .nest("/admin", admin::router())
}
