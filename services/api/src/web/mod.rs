pub mod analyze_task;
pub mod candidates;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// Re-export the handlers and middleware so the binary can assemble the server.
pub use middleware::identify_caller;
pub use rest::{analyze_handler, grant_bonus_handler, health_handler, quota_status_handler};
pub use state::AppState;

/// Builds the API router. CORS and the Swagger UI are layered on by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let max_upload_bytes = app_state.config.max_upload_bytes;

    // Routes that act on behalf of a caller.
    let caller_routes = Router::new()
        .route("/analyze", post(analyze_handler))
        .route("/grant-bonus", post(grant_bonus_handler))
        .route("/quota-status", get(quota_status_handler))
        .layer(axum_middleware::from_fn(identify_caller));

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .merge(caller_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(app_state)
}
