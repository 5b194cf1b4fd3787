//! Bidding engine and auction lifecycle scheduling for the Annexe
//! backend.

pub mod bidding;
pub mod error;
pub mod scheduler;
pub mod store;

pub use bidding::{validate_bid, BiddingEngine};
pub use error::{BidRejection, EngineError, EngineResult};
pub use scheduler::{LifecycleScheduler, SchedulerConfig};
pub use store::AuctionStore;
