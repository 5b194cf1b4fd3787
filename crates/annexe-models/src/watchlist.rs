//! Watchlist entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auction::AuctionId;
use crate::user::UserId;

/// A user's subscription to one auction's lifecycle.
///
/// Uniqueness is enforced per (user, auction) pair at the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: String,
    pub user_id: UserId,
    pub auction_id: AuctionId,
    pub created_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn new(user_id: UserId, auction_id: AuctionId) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            auction_id,
            created_at: Utc::now(),
        }
    }
}
