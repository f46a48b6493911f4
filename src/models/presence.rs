//! Presence: user identities, room keys, and the online/offline status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Prefix of every room key; a user's sessions are registered under `chat_<user_id>`.
pub const ROOM_KEY_PREFIX: &str = "chat_";

/// An authenticated user as seen by the real-time core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
}

impl UserIdentity {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    pub fn room_key(&self) -> String {
        room_key(self.id)
    }
}

/// Fan-out address for all live sessions of `user_id`.
pub fn room_key(user_id: UserId) -> String {
    format!("{}{}", ROOM_KEY_PREFIX, user_id)
}

/// Self-reported presence status. Serialized exactly as clients send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, PresenceStatus::Online)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "Online",
            PresenceStatus::Offline => "Offline",
        }
    }
}

/// Generate a unique session id.
pub fn generate_session_id() -> String {
    format!("{}.{}", std::process::id(), Uuid::new_v4().as_simple())
}
