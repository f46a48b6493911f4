//! Store boundary used by the real-time core and the delivery triggers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{UserId, UserIdentity};

use super::repositories::{self, ConversationRow, FriendshipRow, MessageRow};
use super::DbPool;

/// Everything the core reads from or writes to the relational store.
///
/// Each call is treated as atomic on commit; the core never rolls back.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserIdentity>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserIdentity>>;

    async fn set_online_flag(&self, user_id: UserId, is_online: bool) -> AppResult<()>;

    /// Peer identities over ACCEPTED friendship edges.
    async fn find_accepted_peers(&self, user_id: UserId) -> AppResult<Vec<UserId>>;

    /// True when any edge exists between the two users, in either direction.
    async fn friendship_exists(&self, a: UserId, b: UserId) -> AppResult<bool>;

    async fn create_friend_request(
        &self,
        requester: UserId,
        receiver: UserId,
    ) -> AppResult<FriendshipRow>;

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<ConversationRow>>;

    async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: UserId,
        content: &str,
    ) -> AppResult<MessageRow>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<UserIdentity>> {
        Ok(repositories::user_get_by_id(&self.pool, id)
            .await?
            .map(UserIdentity::from))
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<UserIdentity>> {
        Ok(repositories::user_find_by_username(&self.pool, username)
            .await?
            .map(UserIdentity::from))
    }

    async fn set_online_flag(&self, user_id: UserId, is_online: bool) -> AppResult<()> {
        repositories::user_set_online(&self.pool, user_id, is_online).await
    }

    async fn find_accepted_peers(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        repositories::friendship_accepted_peers(&self.pool, user_id).await
    }

    async fn friendship_exists(&self, a: UserId, b: UserId) -> AppResult<bool> {
        repositories::friendship_exists_between(&self.pool, a, b).await
    }

    async fn create_friend_request(
        &self,
        requester: UserId,
        receiver: UserId,
    ) -> AppResult<FriendshipRow> {
        repositories::friendship_create_pending(&self.pool, requester, receiver).await
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<ConversationRow>> {
        repositories::conversation_get_by_id(&self.pool, id).await
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: UserId,
        content: &str,
    ) -> AppResult<MessageRow> {
        repositories::message_create(&self.pool, conversation_id, sender_id, content).await
    }
}
