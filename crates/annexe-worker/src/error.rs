//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Store error: {0}")]
    Store(#[from] annexe_firestore::FirestoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] annexe_redis::CacheError),

    #[error("Mail error: {0}")]
    Mail(#[from] annexe_mail::MailError),
}
