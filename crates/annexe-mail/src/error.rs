//! Mail client error types.

use thiserror::Error;

pub type MailResult<T> = Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail provider unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MailError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MailError::ServiceUnavailable(_) | MailError::Network(_)
        )
    }
}
