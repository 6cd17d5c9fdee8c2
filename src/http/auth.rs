use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::error::ApiError;
use super::AppState;

/// Token claims issued by the account service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub exp: u64,
}

/// The caller, resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Invalid token.".to_string())
    })?;
    Ok(data.claims)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Access denied. No token provided.".to_string()))?;

        let claims = verify_token(token.trim(), &state.jwt_secret)?;
        let user = state
            .contacts
            .find_user(claims.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Invalid token. User not found.".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            name: user.name,
        })
    }
}
