//! Event and message models for the WebSocket and HTTP API.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use super::presence::PresenceStatus;

/// Event delivered to a session's outbound channel.
///
/// Wire shapes (JSON text frames):
/// - `StatusUpdate` → `{"type":"status_update","username":..,"status":..}`
/// - `ChatMessage` → `{"data": <message>}`
/// - `FriendRequestNotice` → `{"type":"friend_request"}`
/// - `ConnectionEstablished` → `{"type":"connection_established","session_id":..}`
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    StatusUpdate {
        username: String,
        status: PresenceStatus,
    },
    ChatMessage {
        payload: serde_json::Value,
    },
    FriendRequestNotice,
    ConnectionEstablished {
        session_id: String,
    },
}

impl ServerEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::StatusUpdate { .. } => "status_update",
            ServerEvent::ChatMessage { .. } => "chat_message",
            ServerEvent::FriendRequestNotice => "friend_request",
            ServerEvent::ConnectionEstablished { .. } => "connection_established",
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ServerEvent::StatusUpdate { username, status } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "status_update")?;
                map.serialize_entry("username", username)?;
                map.serialize_entry("status", status)?;
                map.end()
            }
            ServerEvent::ChatMessage { payload } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("data", payload)?;
                map.end()
            }
            ServerEvent::FriendRequestNotice => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "friend_request")?;
                map.end()
            }
            ServerEvent::ConnectionEstablished { session_id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "connection_established")?;
                map.serialize_entry("session_id", session_id)?;
                map.end()
            }
        }
    }
}

/// Inbound WebSocket message. The only recognized shape is a presence update.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub status: PresenceStatus,
}

/// Body of `POST /api/conversations/{id}/messages/`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub content: String,
}

/// Body of `POST /api/friendships/`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FriendRequestRequest {
    #[validate(length(min = 1, max = 30))]
    pub friend_username: String,
}
