//! Engine error types.

use thiserror::Error;

use annexe_firestore::FirestoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// A bid turned away by validation. The messages are the exact strings
/// returned to clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BidRejection {
    #[error("Bid must be greater than the auction starting price of: NGN {floor}")]
    BelowFloor { floor: f64 },

    #[error("Can only place a bid for an ongoing auction")]
    NotOpen,

    #[error("Bid must be higher than the current highest bid: NGN {highest}")]
    NotHighest { highest: f64 },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Auction not found")]
    AuctionNotFound,

    #[error("{0}")]
    Rejected(#[from] BidRejection),

    /// Lost the write race twice; the caller should retry the request.
    #[error("Auction was updated concurrently, please retry")]
    Conflict,

    #[error(transparent)]
    Store(#[from] FirestoreError),
}
