//! Command submission handler.

use std::sync::Arc;

use axum::{extract::State, Json};

use super::AppState;
use crate::chat::CommandHandler;
use crate::web::dto::{ApiResponse, CommandReply, CommandRequest};
use crate::web::error::ApiError;

/// POST /api/commands - Run a chat line and return the reply text.
pub async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<ApiResponse<CommandReply>>, ApiError> {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }

    let reply = CommandHandler::new(&state.db, &state.command_prefix)
        .handle(user_id, &req.content)
        .await?;

    Ok(Json(ApiResponse::new(CommandReply { reply })))
}
