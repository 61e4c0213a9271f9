//! Router configuration for the command endpoint.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{submit_command, AppState};
use super::middleware::require_api_token;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/commands", post(submit_command))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_api_token,
        ));

    Router::new()
        .nest("/api", api_routes)
        .with_state(app_state)
        .merge(create_health_router())
        .layer(TraceLayer::new_for_http())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
