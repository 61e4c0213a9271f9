//! HTTP endpoint for the chat bridge.
//!
//! The chat gateway connection lives outside this service; the bridge
//! forwards each message here and posts the returned reply.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
