//! Request DTOs for the command endpoint.

use serde::Deserialize;

/// A chat line submitted by the chat bridge.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Chat platform ID of the author.
    pub user_id: String,
    /// Raw message text, including the command prefix.
    pub content: String,
}
