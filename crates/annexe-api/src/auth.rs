//! Session token authentication.
//!
//! Tokens are HS256 JWTs issued at login/verification and presented as
//! a bearer header on protected routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use annexe_models::{User, UserId};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email
    pub email: String,
    /// Display name
    pub name: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Sign a session token for a user.
pub fn issue_token(user: &User, config: &ApiConfig) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now,
        exp: now + config.jwt_ttl.as_secs() as i64,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("Failed to sign token: {e}")))
}

/// Verify a session token and return its claims.
pub fn verify_token(token: &str, config: &ApiConfig) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: UserId::from_string(claims.sub),
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = verify_token(token, &state.config)?;
        Ok(AuthUser::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig {
            jwt_secret: "test-secret".to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn token_round_trip() {
        let config = config();
        let user = User::new("Ada", "ada@example.com", "hash".to_string());

        let token = issue_token(&user, &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let user = User::new("Ada", "ada@example.com", "hash".to_string());
        let token = issue_token(&user, &config()).unwrap();

        let other = ApiConfig {
            jwt_secret: "other-secret".to_string(),
            ..ApiConfig::default()
        };
        assert!(verify_token(&token, &other).is_err());
    }
}
