//! Paystack client error types.

use thiserror::Error;

pub type PaystackResult<T> = Result<T, PaystackError>;

#[derive(Debug, Error)]
pub enum PaystackError {
    /// Paystack returned `status: false` or an HTTP error.
    #[error("{0}")]
    Api(String),

    #[error("Gateway unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl PaystackError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaystackError::ServiceUnavailable(_) | PaystackError::Network(_)
        )
    }
}
