//! Presence tracker: persist a user's self-reported status and tell their accepted friends.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::db::ChatStore;
use crate::error::AppResult;
use crate::models::{PresenceStatus, ServerEvent, UserIdentity};

use super::router::EventRouter;

#[derive(Clone)]
pub struct PresenceTracker {
    store: Arc<dyn ChatStore>,
    router: EventRouter,
}

impl PresenceTracker {
    pub fn new(store: Arc<dyn ChatStore>, router: EventRouter) -> Self {
        Self { store, router }
    }

    /// Persist `status` for `user`, then fan a status update out to every accepted
    /// friend. Returns the number of sessions the update was enqueued on.
    ///
    /// The flag is written before any notification goes out. Store failures abort
    /// the whole update; nothing is retried.
    #[instrument(skip(self, user, status), fields(user_id = %user.id, status = status.as_str()))]
    pub async fn update_status(
        &self,
        user: &UserIdentity,
        status: PresenceStatus,
    ) -> AppResult<usize> {
        self.store.set_online_flag(user.id, status.is_online()).await?;

        let peers = self.store.find_accepted_peers(user.id).await?;
        let mut delivered = 0;
        for peer in &peers {
            delivered += self.router.publish_to_user(
                *peer,
                ServerEvent::StatusUpdate {
                    username: user.username.clone(),
                    status,
                },
            );
        }
        debug!(peers = peers.len(), delivered, "status fanned out");
        Ok(delivered)
    }
}
