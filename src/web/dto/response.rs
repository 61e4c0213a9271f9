//! Response DTOs for the command endpoint.

use serde::Serialize;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Outcome of a submitted chat line.
#[derive(Debug, Serialize)]
pub struct CommandReply {
    /// Text to post back, or `null` when the line was not a command.
    pub reply: Option<String>,
}
