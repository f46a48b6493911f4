//! Connection registry: live sessions keyed by room key, with admission control.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::{generate_session_id, ServerEvent, UserId, UserIdentity};

pub type SessionId = String;
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Close code sent to connections that arrive without an authenticated identity.
pub const CLOSE_UNAUTHENTICATED: u16 = 4001;

/// Why a connection was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("connection has no authenticated identity")]
    Unauthenticated,
}

impl AdmissionError {
    /// WebSocket close code the connection is closed with.
    pub fn close_code(&self) -> u16 {
        match self {
            AdmissionError::Unauthenticated => CLOSE_UNAUTHENTICATED,
        }
    }
}

/// Registry's reference to one live session: where to deliver events for it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    owner: UserId,
    room_key: String,
    tx: EventSender,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn room_key(&self) -> &str {
        &self.room_key
    }

    /// Enqueue an event on this session's delivery channel. Never blocks.
    /// Returns false once the session's writer has gone away.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// An admitted session: its owner, its outbound queue, and its registry entry.
///
/// The registry entry is released when `registration` is dropped, so every exit
/// path of the session (close, error, abort, shutdown) removes it.
pub struct Session {
    pub owner: UserIdentity,
    pub events: EventReceiver,
    pub registration: Registration,
}

/// Scoped registry membership. Dropping it removes the session from the registry.
pub struct Registration {
    registry: ConnectionRegistry,
    handle: SessionHandle,
}

impl Registration {
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.handle);
    }
}

/// Maps room keys to the set of sessions registered under them.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    rooms: Arc<DashMap<String, HashMap<SessionId, SessionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection for `identity`. Rejects when no identity was attached.
    pub fn admit(&self, identity: Option<UserIdentity>) -> Result<Session, AdmissionError> {
        let owner = identity.ok_or(AdmissionError::Unauthenticated)?;
        let (tx, events) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            id: generate_session_id(),
            owner: owner.id,
            room_key: owner.room_key(),
            tx,
        };

        let count = {
            let mut room = self.rooms.entry(handle.room_key.clone()).or_default();
            room.insert(handle.id.clone(), handle.clone());
            room.len()
        };
        info!(
            user_id = %owner.id,
            session_id = %handle.id,
            room_key = %handle.room_key,
            sessions = count,
            "session admitted"
        );

        Ok(Session {
            owner,
            events,
            registration: Registration {
                registry: self.clone(),
                handle,
            },
        })
    }

    /// Remove a session from its room. Idempotent; returns whether it was present.
    pub fn remove(&self, handle: &SessionHandle) -> bool {
        let removed = match self.rooms.get_mut(&handle.room_key) {
            Some(mut room) => room.remove(&handle.id).is_some(),
            None => false,
        };
        self.rooms.remove_if(&handle.room_key, |_, room| room.is_empty());
        if removed {
            debug!(session_id = %handle.id, room_key = %handle.room_key, "session removed");
        }
        removed
    }

    /// Snapshot of the sessions currently registered under `room_key`.
    pub fn sessions_for(&self, room_key: &str) -> Vec<SessionHandle> {
        self.rooms
            .get(room_key)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of live sessions across all rooms.
    pub fn session_count(&self) -> usize {
        self.rooms.iter().map(|room| room.len()).sum()
    }
}
