//! API error types.
//!
//! Every failed request resolves to the same JSON envelope:
//! `{ "success": false, "message": "..." }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use annexe_engine::EngineError;
use annexe_firestore::FirestoreError;
use annexe_mail::MailError;
use annexe_paystack::PaystackError;
use annexe_redis::CacheError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FirestoreError> for ApiError {
    fn from(e: FirestoreError) -> Self {
        match e {
            FirestoreError::NotFound(msg) => ApiError::NotFound(msg),
            FirestoreError::AlreadyExists(msg) => ApiError::Conflict(msg),
            FirestoreError::PreconditionFailed(_) => {
                ApiError::Conflict("Resource was updated concurrently, please retry".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::AuctionNotFound => ApiError::NotFound("Auction not found".to_string()),
            EngineError::Rejected(rejection) => ApiError::BadRequest(rejection.to_string()),
            EngineError::Conflict => ApiError::Conflict(e.to_string()),
            EngineError::Store(store) => store.into(),
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<PaystackError> for ApiError {
    fn from(e: PaystackError) -> Self {
        match e {
            PaystackError::Api(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(e: bcrypt::BcryptError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let message = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annexe_engine::BidRejection;

    #[test]
    fn engine_rejection_maps_to_bad_request() {
        let err: ApiError = EngineError::Rejected(BidRejection::NotOpen).into();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(
            err.to_string(),
            "Can only place a bid for an ongoing auction"
        );
    }

    #[test]
    fn conflict_maps_to_409() {
        let err: ApiError = EngineError::Conflict.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
