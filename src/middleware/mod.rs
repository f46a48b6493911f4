//! Middleware: identity attachment for WebSocket admission and HTTP write paths.

pub mod auth;

pub use auth::{resolve_identity, AuthUser};
