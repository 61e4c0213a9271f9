//! Middleware for the command endpoint.

pub mod auth;

pub use auth::require_api_token;
