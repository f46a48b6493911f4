//! Shared fixtures: an in-memory store and a server bound to a random local port.

#![allow(dead_code)]

use async_trait::async_trait;
use chat_presence::auth::JwtSecret;
use chat_presence::db::{ChatStore, ConversationRow, FriendshipRow, MessageRow};
use chat_presence::error::{AppError, AppResult};
use chat_presence::models::{FriendshipStatus, UserId, UserIdentity};
use chat_presence::{create_app, AppState};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret-min-32-chars!!";

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, (String, bool)>,
    friendships: Vec<FriendshipRow>,
    conversations: Vec<ConversationRow>,
    messages: Vec<MessageRow>,
}

/// In-memory `ChatStore` used in place of PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    peer_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    /// Make online-flag writes fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Slow down every friend lookup by `delay`.
    pub fn set_peer_delay(&self, delay: Duration) {
        *self.peer_delay.lock().unwrap() = Some(delay);
    }

    pub fn add_user(&self, username: &str) -> UserIdentity {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .unwrap()
            .users
            .insert(id, (username.to_string(), false));
        UserIdentity::new(id, username)
    }

    pub fn befriend(&self, a: &UserIdentity, b: &UserIdentity) {
        self.tables.lock().unwrap().friendships.push(FriendshipRow {
            id: Uuid::new_v4(),
            user1_id: a.id,
            user2_id: b.id,
            status: FriendshipStatus::Accepted.as_str().to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn add_conversation(&self, a: &UserIdentity, b: &UserIdentity) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().conversations.push(ConversationRow {
            id,
            user1_id: Some(a.id),
            user2_id: Some(b.id),
        });
        id
    }

    pub fn is_online(&self, user: &UserIdentity) -> bool {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&user.id)
            .map(|(_, online)| *online)
            .unwrap_or(false)
    }

    pub fn friendships(&self) -> Vec<FriendshipRow> {
        self.tables.lock().unwrap().friendships.clone()
    }

    pub fn messages(&self) -> Vec<MessageRow> {
        self.tables.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserIdentity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .get(&id)
            .map(|(name, _)| UserIdentity::new(id, name.clone())))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserIdentity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|(_, (name, _))| name == username)
            .map(|(id, (name, _))| UserIdentity::new(*id, name.clone())))
    }

    async fn set_online_flag(&self, user_id: UserId, is_online: bool) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Db(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("user".to_string()))?;
        user.1 = is_online;
        Ok(())
    }

    async fn find_accepted_peers(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let delay = *self.peer_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted.as_str())
            .filter_map(|f| {
                if f.user1_id == user_id {
                    Some(f.user2_id)
                } else if f.user2_id == user_id {
                    Some(f.user1_id)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn friendship_exists(&self, a: UserId, b: UserId) -> AppResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.friendships.iter().any(|f| {
            (f.user1_id == a && f.user2_id == b) || (f.user1_id == b && f.user2_id == a)
        }))
    }

    async fn create_friend_request(
        &self,
        requester: UserId,
        receiver: UserId,
    ) -> AppResult<FriendshipRow> {
        let row = FriendshipRow {
            id: Uuid::new_v4(),
            user1_id: requester,
            user2_id: receiver,
            status: FriendshipStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().friendships.push(row.clone());
        Ok(row)
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<ConversationRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: UserId,
        content: &str,
    ) -> AppResult<MessageRow> {
        let row = MessageRow {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Some(sender_id),
            content: content.to_string(),
            is_read_by_receiver: false,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().messages.push(row.clone());
        Ok(row)
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestServer {
    pub fn token_for(&self, user: &UserIdentity) -> String {
        self.state.jwt_secret.issue(user.id).unwrap()
    }

    pub fn app(&self) -> axum::Router {
        create_app(self.state.clone())
    }

    /// Open a WebSocket with an optional bearer token. Does not read anything.
    pub async fn open(&self, token: Option<&str>) -> Client {
        let mut request = format!("ws://{}/ws/chat/", self.addr)
            .into_client_request()
            .unwrap();
        if let Some(token) = token {
            request
                .headers_mut()
                .insert("authorization", format!("Bearer {}", token).parse().unwrap());
        }
        let (client, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        client
    }

    /// Connect as `user` and wait for the connection acknowledgment.
    pub async fn connect(&self, user: &UserIdentity) -> Client {
        let mut client = self.open(Some(&self.token_for(user))).await;
        let ack = next_json(&mut client).await.expect("connection ack");
        assert_eq!(ack["type"], "connection_established");
        client
    }
}

pub async fn start_server() -> TestServer {
    let store = Arc::new(MemoryStore::default());
    let state = AppState::new(store.clone(), JwtSecret::new(JWT_SECRET.to_string()));
    let app = create_app(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, state, store }
}

/// Next JSON text frame, or `None` if nothing arrives within a short window.
pub async fn next_json(client: &mut Client) -> Option<serde_json::Value> {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), client.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return serde_json::from_str(&text).ok(),
            Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
            _ => return None,
        }
    }
}

/// Assert that no text frame arrives within a short window.
pub async fn assert_silent(client: &mut Client) {
    if let Ok(Some(Ok(Message::Text(text)))) =
        tokio::time::timeout(Duration::from_millis(300), client.next()).await
    {
        panic!("unexpected frame: {}", text);
    }
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

/// Poll `check` until it holds or a couple of seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
