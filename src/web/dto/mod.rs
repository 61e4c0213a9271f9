//! Data Transfer Objects for the command endpoint.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
