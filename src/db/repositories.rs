//! Repositories: users, friendships, conversations, messages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{FriendshipStatus, UserIdentity};

use super::DbPool;

// ---- User ----

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
}

impl From<UserRow> for UserIdentity {
    fn from(row: UserRow) -> Self {
        UserIdentity::new(row.id, row.username)
    }
}

pub async fn user_get_by_id(pool: &DbPool, id: Uuid) -> AppResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn user_find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn user_set_online(pool: &DbPool, id: Uuid, is_online: bool) -> AppResult<()> {
    sqlx::query("UPDATE users SET is_online = $1 WHERE id = $2")
        .bind(is_online)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- Friendships ----

#[derive(Debug, Clone, FromRow)]
pub struct FriendshipRow {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Peers of `user_id` over ACCEPTED edges, whichever side of the edge they sit on.
pub async fn friendship_accepted_peers(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END
        FROM friendships
        WHERE status = $2 AND (user1_id = $1 OR user2_id = $1)
        "#,
    )
    .bind(user_id)
    .bind(FriendshipStatus::Accepted.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(peer,)| peer).collect())
}

pub async fn friendship_exists_between(pool: &DbPool, a: Uuid, b: Uuid) -> AppResult<bool> {
    let row: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM friendships
            WHERE (user1_id = $1 AND user2_id = $2) OR (user1_id = $2 AND user2_id = $1)
        )
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn friendship_create_pending(
    pool: &DbPool,
    requester: Uuid,
    receiver: Uuid,
) -> AppResult<FriendshipRow> {
    let row = sqlx::query_as::<_, FriendshipRow>(
        r#"
        INSERT INTO friendships (user1_id, user2_id, status)
        VALUES ($1, $2, $3)
        RETURNING id, user1_id, user2_id, status, created_at
        "#,
    )
    .bind(requester)
    .bind(receiver)
    .bind(FriendshipStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

// ---- Conversations ----

/// Either participant may be NULL once the user account is deleted.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub id: Uuid,
    pub user1_id: Option<Uuid>,
    pub user2_id: Option<Uuid>,
}

impl ConversationRow {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == Some(user_id) || self.user2_id == Some(user_id)
    }

    /// The other participant, if `user_id` takes part and the other account still exists.
    pub fn peer_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == Some(user_id) {
            self.user2_id
        } else if self.user2_id == Some(user_id) {
            self.user1_id
        } else {
            None
        }
    }
}

pub async fn conversation_get_by_id(pool: &DbPool, id: Uuid) -> AppResult<Option<ConversationRow>> {
    let row = sqlx::query_as::<_, ConversationRow>(
        "SELECT id, user1_id, user2_id FROM conversations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ---- Messages ----

/// Stored message; its serialization is the payload pushed to the receiver.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageRow {
    pub id: Uuid,
    #[serde(rename = "conversation")]
    pub conversation_id: Uuid,
    #[serde(rename = "sender")]
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub is_read_by_receiver: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert a message and make it the conversation's last message, in one transaction.
pub async fn message_create(
    pool: &DbPool,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> AppResult<MessageRow> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (conversation_id, sender_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, conversation_id, sender_id, content, is_read_by_receiver, created_at
        "#,
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE conversations SET last_message_id = $1, last_message_at = $2 WHERE id = $3",
    )
    .bind(row.id)
    .bind(row.created_at)
    .bind(conversation_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}
