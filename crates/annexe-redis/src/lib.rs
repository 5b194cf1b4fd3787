//! Redis cache and pub/sub channels for the Annexe backend.

pub mod cache;
pub mod channel;
pub mod error;

pub use cache::{all_auctions_key, auction_key, CacheConfig, CacheStore, DEFAULT_TTL};
pub use channel::EventChannel;
pub use error::{CacheError, CacheResult};
