//! HTTP and WebSocket request handlers.

pub mod http;
pub mod triggers;
pub mod ws;

pub use http::*;
pub use triggers::*;
pub use ws::*;
