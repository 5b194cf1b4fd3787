//! Lifecycle events published by the scheduler and consumed by the
//! notification worker.

use serde::{Deserialize, Serialize};

use crate::auction::{Auction, AuctionId};

/// A status transition that downstream consumers react to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "auction")]
pub enum AuctionEvent {
    /// Start boundary crossed; the auction is now open for bidding.
    #[serde(rename = "auction.started")]
    Started(Auction),
    /// End boundary crossed; the auction is closed, winner resolved if any.
    #[serde(rename = "auction.ended")]
    Ended(Auction),
}

impl AuctionEvent {
    pub fn auction(&self) -> &Auction {
        match self {
            AuctionEvent::Started(a) | AuctionEvent::Ended(a) => a,
        }
    }

    pub fn auction_id(&self) -> &AuctionId {
        &self.auction().id
    }

    /// Stable transition label, also used as the de-duplication key suffix.
    pub fn transition(&self) -> &'static str {
        match self {
            AuctionEvent::Started(_) => "started",
            AuctionEvent::Ended(_) => "ended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserId;
    use chrono::{Duration, Utc};

    #[test]
    fn event_tag_round_trip() {
        let now = Utc::now();
        let auction = Auction::new(
            UserId::from("u1"),
            "Lamp",
            "Brass desk lamp",
            50.0,
            now + Duration::hours(1),
            now + Duration::hours(2),
        );
        let event = AuctionEvent::Started(auction);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"auction.started\""));

        let parsed: AuctionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.transition(), "started");
    }
}
