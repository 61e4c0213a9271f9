//! API handlers for the command endpoint.

pub mod command;

pub use command::*;

use std::sync::Arc;

use crate::db::Database;

/// Shared database handle.
pub type SharedDatabase = Arc<Database>;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle.
    pub db: SharedDatabase,
    /// Prefix marking a chat line as a command.
    pub command_prefix: String,
    /// Bearer token the chat bridge must present, if any.
    pub api_token: Option<String>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: SharedDatabase, command_prefix: impl Into<String>) -> Self {
        Self {
            db,
            command_prefix: command_prefix.into(),
            api_token: None,
        }
    }

    /// Require `token` on API requests. An empty token disables the check.
    pub fn with_api_token(mut self, token: &str) -> Self {
        self.api_token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
        self
    }
}
