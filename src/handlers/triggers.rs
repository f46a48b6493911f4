//! Delivery triggers: write paths that notify the peer after their commit succeeds.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::MessageRow;
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::{FriendRequestRequest, SendMessageRequest};

/// POST /api/conversations/{id}/messages/: store a message, then push it to the receiver.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(sender): AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Message content may not be blank".to_string()));
    }

    let conversation = state
        .store
        .find_conversation(conversation_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;
    if !conversation.is_participant(sender.id) {
        return Err(AppError::Forbidden(
            "You are not a participant in this conversation".to_string(),
        ));
    }

    let message = state
        .store
        .create_message(conversation.id, sender.id, &body.content)
        .await?;

    // Commit is done; a missed notification does not undo it.
    if let Some(receiver) = conversation.peer_of(sender.id) {
        let payload = serde_json::to_value(&message)?;
        let delivered = state.router.notify_chat_message(receiver, payload);
        info!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            receiver = %receiver,
            delivered,
            "chat message sent"
        );
    }

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
    pub id: Uuid,
    pub friend_username: String,
    pub status: String,
}

/// POST /api/friendships/: store a pending friend request, then notify the receiver.
pub async fn send_friend_request(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(body): Json<FriendRequestRequest>,
) -> Result<(StatusCode, Json<FriendRequestResponse>), AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let friend = state
        .store
        .find_user_by_username(&body.friend_username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if friend.id == requester.id {
        return Err(AppError::Validation(
            "You cannot be friends with yourself.".to_string(),
        ));
    }
    if state.store.friendship_exists(requester.id, friend.id).await? {
        return Err(AppError::Validation("Friendship already exists.".to_string()));
    }

    let friendship = state
        .store
        .create_friend_request(requester.id, friend.id)
        .await?;

    let delivered = state.router.notify_friend_request(friend.id);
    info!(
        friendship_id = %friendship.id,
        requester = %requester.id,
        receiver = %friend.id,
        delivered,
        "friend request sent"
    );

    Ok((
        StatusCode::CREATED,
        Json(FriendRequestResponse {
            id: friendship.id,
            friend_username: friend.username,
            status: friendship.status,
        }),
    ))
}
