//! WebSocket message types.
//!
//! Payload field names match what the existing web client listens for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auction::{AuctionId, Bid};
use crate::user::UserId;

/// Messages pushed to clients subscribed to an auction room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum WsMessage {
    /// A bid was accepted for the auction the client is watching.
    #[serde(rename = "new bid")]
    NewBid {
        #[serde(rename = "auctionId")]
        auction_id: AuctionId,
        #[serde(rename = "bidOwner")]
        bid_owner: UserId,
        amount: f64,
        timestamp: DateTime<Utc>,
        #[serde(rename = "bidderName")]
        bidder_name: String,
    },
}

impl WsMessage {
    /// Build a `new bid` broadcast from an accepted bid.
    pub fn new_bid(auction_id: AuctionId, bid: &Bid, bidder_name: impl Into<String>) -> Self {
        WsMessage::NewBid {
            auction_id,
            bid_owner: bid.bid_owner.clone(),
            amount: bid.amount,
            timestamp: bid.created_at,
            bidder_name: bidder_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bid_serialization() {
        let bid = Bid::new(UserId::from("u1"), 150.0);
        let msg = WsMessage::new_bid(AuctionId::from("a1"), &bid, "Ada");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"event\":\"new bid\""));
        assert!(json.contains("\"bidOwner\":\"u1\""));
        assert!(json.contains("\"bidderName\":\"Ada\""));
        assert!(json.contains("\"auctionId\":\"a1\""));
    }
}
