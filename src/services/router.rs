//! Event router: the single chokepoint for outbound delivery.

use tracing::debug;

use crate::models::{room_key, ServerEvent, UserId};

use super::registry::ConnectionRegistry;

/// Fans events out to every session registered under a room key.
///
/// Best-effort live signaling: no retry, no backoff, nothing kept for peers
/// that are not connected.
#[derive(Clone)]
pub struct EventRouter {
    registry: ConnectionRegistry,
}

impl EventRouter {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Enqueue `event` on every session under `room_key`. Returns how many sessions
    /// accepted it; zero when nobody is connected.
    pub fn publish(&self, room_key: &str, event: ServerEvent) -> usize {
        let sessions = self.registry.sessions_for(room_key);
        let kind = event.kind();
        let delivered = sessions
            .iter()
            .filter(|session| session.deliver(event.clone()))
            .count();
        debug!(room_key = %room_key, event = kind, delivered, "published");
        delivered
    }

    pub fn publish_to_user(&self, user_id: UserId, event: ServerEvent) -> usize {
        self.publish(&room_key(user_id), event)
    }

    /// Push a committed chat message to its receiver.
    pub fn notify_chat_message(&self, receiver: UserId, payload: serde_json::Value) -> usize {
        self.publish_to_user(receiver, ServerEvent::ChatMessage { payload })
    }

    /// Tell the receiver of a committed friend request about it.
    pub fn notify_friend_request(&self, receiver: UserId) -> usize {
        self.publish_to_user(receiver, ServerEvent::FriendRequestNotice)
    }
}
