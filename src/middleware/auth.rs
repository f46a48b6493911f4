//! Identity attachment: resolve a bearer token to an existing user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use tracing::debug;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::UserIdentity;

/// Resolve `token` to a user, or `None` when the token is missing, invalid,
/// expired, or names a user that does not exist.
pub async fn resolve_identity(state: &AppState, token: Option<&str>) -> Option<UserIdentity> {
    let token = token?;
    let user_id = match state.jwt_secret.validate(token) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "token rejected");
            return None;
        }
    };
    match state.store.find_user(user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            debug!(user_id = %user_id, "token names unknown user");
            None
        }
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "user lookup failed");
            None
        }
    }
}

/// Extractor: authenticated user from `Authorization: Bearer <jwt>`.
#[derive(Clone, Debug)]
pub struct AuthUser(pub UserIdentity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Auth("Missing or invalid Authorization header".to_string()))?;
        let user_id = state.jwt_secret.validate(bearer.token())?;
        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Auth("User not found".to_string()))?;
        Ok(AuthUser(user))
    }
}
