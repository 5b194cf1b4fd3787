//! Shared data models for the Annexe auction backend.
//!
//! This crate provides Serde-serializable types for:
//! - Auctions, bids and the auction lifecycle state machine
//! - Users, OTP records and bank details
//! - Watchlist entries
//! - Lifecycle events and WebSocket message schemas

pub mod auction;
pub mod events;
pub mod user;
pub mod watchlist;
pub mod ws;

// Re-export common types
pub use auction::{Auction, AuctionId, AuctionStatus, Bid, InvalidTransition};
pub use events::AuctionEvent;
pub use user::{BankDetails, OtpRecord, User, UserId};
pub use watchlist::WatchlistEntry;
pub use ws::WsMessage;
