//! Auction and bid models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::user::UserId;

/// Unique identifier for an auction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuctionId(pub String);

impl AuctionId {
    /// Generate a new random auction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AuctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AuctionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AuctionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Auction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    /// Created, start time not yet reached
    #[default]
    NotStarted,
    /// Open for bidding
    Ongoing,
    /// End time reached
    Closed,
    /// Removed by the creator before completion
    Canceled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::NotStarted => "NOT_STARTED",
            AuctionStatus::Ongoing => "ONGOING",
            AuctionStatus::Closed => "CLOSED",
            AuctionStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuctionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(AuctionStatus::NotStarted),
            "ONGOING" => Ok(AuctionStatus::Ongoing),
            "CLOSED" => Ok(AuctionStatus::Closed),
            "CANCELED" => Ok(AuctionStatus::Canceled),
            other => Err(format!("unknown auction status: {other}")),
        }
    }
}

/// Attempted status change that the lifecycle state machine forbids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid auction transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: AuctionStatus,
    pub to: AuctionStatus,
}

/// A single bid. Immutable once appended to an auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Bidder identity
    pub bid_owner: UserId,
    /// Offered amount
    pub amount: f64,
    /// Submission timestamp
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn new(bid_owner: UserId, amount: f64) -> Self {
        Self {
            bid_owner,
            amount,
            created_at: Utc::now(),
        }
    }
}

/// A time-boxed sale with a bid history and a single highest accepted bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub id: AuctionId,
    pub product_name: String,
    pub description: String,
    pub creator_id: UserId,
    pub starting_price: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: AuctionStatus,
    /// Append-only, insertion order = submission order.
    #[serde(default)]
    pub bids: Vec<Bid>,
    /// Denormalized copy of the highest accepted bid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_bid: Option<Bid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    /// Create a new auction in `NOT_STARTED`.
    pub fn new(
        creator_id: UserId,
        product_name: impl Into<String>,
        description: impl Into<String>,
        starting_price: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AuctionId::new(),
            product_name: product_name.into(),
            description: description.into(),
            creator_id,
            starting_price,
            start_date,
            end_date,
            main_image: None,
            images: Vec::new(),
            status: AuctionStatus::NotStarted,
            bids: Vec::new(),
            winning_bid: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Highest amount across all stored bids, or 0 when none exist.
    pub fn highest_bid_amount(&self) -> f64 {
        self.bids.iter().fold(0.0, |acc, b| acc.max(b.amount))
    }

    /// Whether the creator may edit or delete this auction.
    pub fn is_mutable(&self) -> bool {
        self.status != AuctionStatus::Ongoing
    }

    /// Append an accepted bid and mirror it into `winning_bid`.
    ///
    /// Callers must have validated the amount; this only maintains the
    /// `winning_bid == max(bids)` invariant.
    pub fn apply_bid(&mut self, bid: Bid) {
        self.bids.push(bid.clone());
        self.winning_bid = Some(bid);
        self.updated_at = Utc::now();
    }

    /// NOT_STARTED -> ONGOING, driven by the scheduler at the start boundary.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AuctionStatus::NotStarted, AuctionStatus::Ongoing)
    }

    /// ONGOING -> CLOSED, driven by the scheduler at the end boundary.
    pub fn close(&mut self) -> Result<(), InvalidTransition> {
        self.transition(AuctionStatus::Ongoing, AuctionStatus::Closed)
    }

    /// Terminal cancellation, reachable only while not ONGOING.
    pub fn cancel(&mut self) -> Result<(), InvalidTransition> {
        if self.status == AuctionStatus::Ongoing {
            return Err(InvalidTransition {
                from: self.status,
                to: AuctionStatus::Canceled,
            });
        }
        self.status = AuctionStatus::Canceled;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn transition(
        &mut self,
        expected: AuctionStatus,
        next: AuctionStatus,
    ) -> Result<(), InvalidTransition> {
        if self.status != expected {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_auction() -> Auction {
        let now = Utc::now();
        Auction::new(
            UserId::from("creator-1"),
            "Vintage camera",
            "Working 1972 rangefinder",
            100.0,
            now + Duration::hours(1),
            now + Duration::hours(25),
        )
    }

    #[test]
    fn new_auction_is_not_started() {
        let auction = sample_auction();
        assert_eq!(auction.status, AuctionStatus::NotStarted);
        assert!(auction.bids.is_empty());
        assert!(auction.winning_bid.is_none());
    }

    #[test]
    fn apply_bid_mirrors_winning_bid() {
        let mut auction = sample_auction();
        auction.start().unwrap();

        auction.apply_bid(Bid::new(UserId::from("u1"), 150.0));
        auction.apply_bid(Bid::new(UserId::from("u2"), 200.0));

        assert_eq!(auction.bids.len(), 2);
        assert_eq!(auction.winning_bid.as_ref().unwrap().amount, 200.0);
        assert_eq!(auction.highest_bid_amount(), 200.0);
    }

    #[test]
    fn lifecycle_transitions_are_ordered() {
        let mut auction = sample_auction();
        assert!(auction.close().is_err());

        auction.start().unwrap();
        assert_eq!(auction.status, AuctionStatus::Ongoing);
        assert!(auction.start().is_err());

        auction.close().unwrap();
        assert_eq!(auction.status, AuctionStatus::Closed);
        assert!(auction.start().is_err());
    }

    #[test]
    fn cancel_forbidden_while_ongoing() {
        let mut auction = sample_auction();
        auction.start().unwrap();
        assert!(!auction.is_mutable());
        assert!(auction.cancel().is_err());

        auction.close().unwrap();
        assert!(auction.cancel().is_ok());
        assert_eq!(auction.status, AuctionStatus::Canceled);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&AuctionStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
    }

    #[test]
    fn auction_json_uses_camel_case() {
        let auction = sample_auction();
        let json = serde_json::to_string(&auction).unwrap();
        assert!(json.contains("\"productName\""));
        assert!(json.contains("\"startingPrice\""));
        assert!(!json.contains("\"winningBid\""));
    }
}
