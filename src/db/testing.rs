//! Presence-only store for unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{UserId, UserIdentity};

use super::repositories::{ConversationRow, FriendshipRow, MessageRow};
use super::store::ChatStore;

/// Online flags plus a fixed friend list. Can be made slow or unavailable.
#[derive(Default)]
pub struct FlagStore {
    pub friends: Vec<(UserId, UserId)>,
    pub flags: Mutex<Vec<(UserId, bool)>>,
    pub unavailable: AtomicBool,
    pub peer_delay: Option<Duration>,
}

impl FlagStore {
    pub fn friends(pairs: Vec<(UserId, UserId)>) -> Self {
        Self {
            friends: pairs,
            ..Default::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn flags(&self) -> Vec<(UserId, bool)> {
        self.flags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatStore for FlagStore {
    async fn find_user(&self, _id: UserId) -> AppResult<Option<UserIdentity>> {
        Ok(None)
    }
    async fn find_user_by_username(&self, _username: &str) -> AppResult<Option<UserIdentity>> {
        Ok(None)
    }
    async fn set_online_flag(&self, user_id: UserId, is_online: bool) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Db(sqlx::Error::PoolTimedOut));
        }
        self.flags.lock().unwrap().push((user_id, is_online));
        Ok(())
    }
    async fn find_accepted_peers(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        if let Some(delay) = self.peer_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .friends
            .iter()
            .filter_map(|&(a, b)| {
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect())
    }
    async fn friendship_exists(&self, _a: UserId, _b: UserId) -> AppResult<bool> {
        Ok(false)
    }
    async fn create_friend_request(&self, _r: UserId, _s: UserId) -> AppResult<FriendshipRow> {
        Err(AppError::Validation("unsupported".into()))
    }
    async fn find_conversation(&self, _id: Uuid) -> AppResult<Option<ConversationRow>> {
        Ok(None)
    }
    async fn create_message(&self, _c: Uuid, _s: UserId, _m: &str) -> AppResult<MessageRow> {
        Err(AppError::Validation("unsupported".into()))
    }
}
