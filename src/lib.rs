//! Real-time presence and delivery core for a social chat backend.
//!
//! Tracks live WebSocket sessions per user, fans presence changes out to
//! accepted friends, and pushes chat messages and friend requests to their
//! receivers once the write has been committed.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use services::{ConnectionRegistry, EventRouter, PresenceTracker};

use axum::routing::{get, post};
use handlers::http;
use tower_http::trace::TraceLayer;

/// Build the API router (ws, delivery triggers, health). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let api_routes = axum::Router::new()
        .route(
            "/conversations/:id/messages/",
            post(handlers::send_message),
        )
        .route("/friendships/", post(handlers::send_friend_request));

    axum::Router::new()
        .route("/ws/chat/", get(handlers::ws_handler))
        .route("/health", get(http::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
