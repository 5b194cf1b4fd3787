//! Firestore REST client and repositories for the Annexe backend.
//!
//! Firestore is the authoritative store. The client exposes the
//! updateTime-preconditioned write the bidding path relies on for
//! optimistic concurrency; repositories map domain types onto document
//! fields.

pub mod auction_repo;
pub mod client;
pub mod error;
pub mod otp_repo;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod user_repo;
pub mod watchlist_repo;

pub use auction_repo::{AuctionRepository, VersionedAuction};
pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use otp_repo::OtpRepository;
pub use retry::RetryConfig;
pub use user_repo::UserRepository;
pub use watchlist_repo::WatchlistRepository;
