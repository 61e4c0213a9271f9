//! Shared-secret authentication for the chat bridge.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Reject requests without the configured bearer token.
///
/// Passes everything through when no token is configured.
pub async fn require_api_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::debug!("Rejected request with wrong API token");
            Err(ApiError::unauthorized("Invalid API token"))
        }
        None => Err(ApiError::unauthorized("Missing authorization")),
    }
}
