//! HTTP handlers: shared state and health.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use crate::auth::JwtSecret;
use crate::db::ChatStore;
use crate::services::{ConnectionRegistry, EventRouter, PresenceTracker};

/// Shared application state for HTTP and WebSocket handlers.
///
/// The registry, router, and tracker share one registry map; cloning the state
/// shares it too.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: ConnectionRegistry,
    pub router: EventRouter,
    pub presence: PresenceTracker,
    pub jwt_secret: JwtSecret,
}

impl AppState {
    /// Wire a fresh registry, router, and presence tracker around `store`.
    pub fn new(store: Arc<dyn ChatStore>, jwt_secret: JwtSecret) -> Self {
        let registry = ConnectionRegistry::new();
        let router = EventRouter::new(registry.clone());
        let presence = PresenceTracker::new(store.clone(), router.clone());
        Self {
            store,
            registry,
            router,
            presence,
            jwt_secret,
        }
    }
}

/// GET /health: liveness probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "chat-presence",
            "connections": state.registry.session_count()
        })),
    )
}
