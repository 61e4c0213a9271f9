//! Error types for the forwarder.

use thiserror::Error;

/// Common error type for the forwarder.
#[derive(Error, Debug)]
pub enum ForwarderError {
    /// Database error.
    ///
    /// Wraps errors from any database backend. Database errors from sqlx
    /// are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Chat platform error.
    #[error("chat error: {0}")]
    Chat(String),

    /// Payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ForwarderError {
    /// Whether the failure is a connectivity problem that may clear up on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ForwarderError::Database(_)
                | ForwarderError::DatabaseConnection(_)
                | ForwarderError::Io(_)
                | ForwarderError::Queue(_)
                | ForwarderError::Chat(_)
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for ForwarderError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                ForwarderError::DatabaseConnection(e.to_string())
            }
            other => ForwarderError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ForwarderError {
    fn from(e: serde_json::Error) -> Self {
        ForwarderError::Codec(e.to_string())
    }
}

impl From<base64::DecodeError> for ForwarderError {
    fn from(e: base64::DecodeError) -> Self {
        ForwarderError::Codec(format!("invalid base64 content: {e}"))
    }
}

impl From<reqwest::Error> for ForwarderError {
    fn from(e: reqwest::Error) -> Self {
        ForwarderError::Chat(e.to_string())
    }
}

/// Result type alias for forwarder operations.
pub type Result<T> = std::result::Result<T, ForwarderError>;
