//! JWT validation (and issuing, for tooling and tests).

use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access-token claims. The account id travels in `user_id`; `sub` is accepted as a fallback.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtSecret {
    secret: String,
}

impl JwtSecret {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        self.issue_with_ttl(user_id, Duration::minutes(60))
    }

    pub fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: Some(user_id.to_string()),
            sub: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(e.to_string()))
    }

    /// Validate signature and expiry; return the user id the token was issued for.
    pub fn validate(&self, token: &str) -> AppResult<Uuid> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        let raw = data
            .claims
            .user_id
            .or(data.claims.sub)
            .ok_or_else(|| AppError::Jwt("token carries no user id".to_string()))?;
        Uuid::parse_str(&raw).map_err(|e| AppError::Jwt(e.to_string()))
    }
}
