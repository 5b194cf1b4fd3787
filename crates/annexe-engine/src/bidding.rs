//! Bid submission.
//!
//! Validation runs against a snapshot of the auction; the write is
//! preconditioned on that snapshot's version so a concurrent bid cannot
//! slip between the check and the append. A lost precondition gets one
//! retry against fresh state before the caller sees a conflict.

use std::sync::Arc;

use tracing::{info, warn};

use annexe_firestore::{AuctionRepository, VersionedAuction};
use annexe_models::{Auction, AuctionId, Bid, UserId, WsMessage};
use annexe_redis::{all_auctions_key, auction_key, CacheStore, EventChannel};

use crate::error::{BidRejection, EngineError, EngineResult};
use crate::store::AuctionStore;

/// Pure validation, in precedence order. The first failing check wins.
pub fn validate_bid(auction: &Auction, amount: f64) -> Result<(), BidRejection> {
    if amount <= auction.starting_price {
        return Err(BidRejection::BelowFloor {
            floor: auction.starting_price,
        });
    }
    if auction.status != annexe_models::AuctionStatus::Ongoing {
        return Err(BidRejection::NotOpen);
    }
    if let Some(winning) = &auction.winning_bid {
        if amount <= winning.amount {
            return Err(BidRejection::NotHighest {
                highest: winning.amount,
            });
        }
    }
    let highest = auction.highest_bid_amount();
    if !auction.bids.is_empty() && amount <= highest {
        return Err(BidRejection::NotHighest { highest });
    }
    Ok(())
}

/// Validates and persists bids, then fans the accepted bid out to the
/// auction's live room.
pub struct BiddingEngine<S = AuctionRepository> {
    auctions: Arc<S>,
    cache: Arc<CacheStore>,
    events: Arc<EventChannel>,
}

impl<S> Clone for BiddingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            auctions: Arc::clone(&self.auctions),
            cache: Arc::clone(&self.cache),
            events: Arc::clone(&self.events),
        }
    }
}

impl<S: AuctionStore> BiddingEngine<S> {
    pub fn new(auctions: Arc<S>, cache: Arc<CacheStore>, events: Arc<EventChannel>) -> Self {
        Self {
            auctions,
            cache,
            events,
        }
    }

    /// Submit a bid on behalf of a user.
    ///
    /// Returns the updated auction on acceptance.
    pub async fn submit_bid(
        &self,
        id: &AuctionId,
        bid_owner: UserId,
        bidder_name: &str,
        amount: f64,
    ) -> EngineResult<Auction> {
        let snapshot = self
            .auctions
            .get_versioned(id)
            .await?
            .ok_or(EngineError::AuctionNotFound)?;

        let auction = match self.try_apply(id, &snapshot, bid_owner.clone(), amount).await {
            Ok(auction) => auction,
            Err(EngineError::Store(e)) if e.is_precondition_failed() => {
                // Someone else wrote first. Re-read, re-validate, try once more.
                let fresh = self
                    .auctions
                    .get_versioned(id)
                    .await?
                    .ok_or(EngineError::AuctionNotFound)?;
                match self.try_apply(id, &fresh, bid_owner, amount).await {
                    Ok(auction) => auction,
                    Err(EngineError::Store(e)) if e.is_precondition_failed() => {
                        warn!(auction_id = %id, "Bid lost the write race twice");
                        return Err(EngineError::Conflict);
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        info!(auction_id = %id, amount, "Bid accepted");
        self.after_accept(&auction, bidder_name).await;
        Ok(auction)
    }

    async fn try_apply(
        &self,
        id: &AuctionId,
        snapshot: &VersionedAuction,
        bid_owner: UserId,
        amount: f64,
    ) -> EngineResult<Auction> {
        validate_bid(&snapshot.auction, amount)?;

        let bid = Bid::new(bid_owner, amount);
        let mut bids = snapshot.auction.bids.clone();
        bids.push(bid.clone());

        let auction = self
            .auctions
            .apply_bid(id, &bids, &bid, &snapshot.version)
            .await?;
        Ok(auction)
    }

    /// Cache upkeep and room broadcast. Best effort; the bid already landed.
    async fn after_accept(&self, auction: &Auction, bidder_name: &str) {
        if let Err(e) = self
            .cache
            .set(&auction_key(auction.id.as_str()), auction)
            .await
        {
            warn!(auction_id = %auction.id, "Failed to refresh auction cache: {}", e);
        }
        if let Err(e) = self.cache.delete(all_auctions_key()).await {
            warn!("Failed to invalidate listing cache: {}", e);
        }

        if let Some(bid) = &auction.winning_bid {
            let message = WsMessage::new_bid(auction.id.clone(), bid, bidder_name);
            if let Err(e) = self.events.publish_bid(&auction.id, &message).await {
                warn!(auction_id = %auction.id, "Failed to broadcast bid: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annexe_models::AuctionStatus;
    use chrono::{Duration, Utc};

    fn ongoing_auction() -> Auction {
        let now = Utc::now();
        let mut auction = Auction::new(
            UserId::from("creator"),
            "Oak chair",
            "Hand carved",
            100.0,
            now - Duration::hours(1),
            now + Duration::hours(23),
        );
        auction.start().unwrap();
        auction
    }

    #[test]
    fn floor_check_runs_before_status_check() {
        let mut auction = ongoing_auction();
        auction.status = AuctionStatus::NotStarted;

        // At or below the floor: floor rejection wins even though the
        // auction is not open.
        assert_eq!(
            validate_bid(&auction, 100.0),
            Err(BidRejection::BelowFloor { floor: 100.0 })
        );
        assert_eq!(validate_bid(&auction, 150.0), Err(BidRejection::NotOpen));
    }

    #[test]
    fn bid_at_starting_price_is_rejected() {
        let auction = ongoing_auction();
        assert_eq!(
            validate_bid(&auction, 100.0),
            Err(BidRejection::BelowFloor { floor: 100.0 })
        );
        assert!(validate_bid(&auction, 100.01).is_ok());
    }

    #[test]
    fn must_beat_current_winning_bid() {
        let mut auction = ongoing_auction();
        auction.apply_bid(Bid::new(UserId::from("u1"), 200.0));

        assert_eq!(
            validate_bid(&auction, 200.0),
            Err(BidRejection::NotHighest { highest: 200.0 })
        );
        assert!(validate_bid(&auction, 201.0).is_ok());
    }

    #[test]
    fn closed_auction_rejects_bids() {
        let mut auction = ongoing_auction();
        auction.close().unwrap();
        assert_eq!(validate_bid(&auction, 500.0), Err(BidRejection::NotOpen));
    }

    use crate::store::testing::MemoryAuctionStore;
    use annexe_redis::CacheConfig;

    // Cache and pub/sub aim at a closed port; both legs are best effort
    // and only log on failure.
    fn engine(store: Arc<MemoryAuctionStore>) -> BiddingEngine<MemoryAuctionStore> {
        let cache = Arc::new(
            CacheStore::new(CacheConfig {
                redis_url: "redis://127.0.0.1:1".to_string(),
                ..CacheConfig::default()
            })
            .unwrap(),
        );
        let events = Arc::new(EventChannel::new("redis://127.0.0.1:1").unwrap());
        BiddingEngine::new(store, cache, events)
    }

    #[tokio::test]
    async fn lost_write_retries_against_fresh_state() {
        let store = Arc::new(MemoryAuctionStore::new());
        let auction = ongoing_auction();
        let id = auction.id.clone();
        store.insert(auction);
        store.queue_rival_bid(150.0);

        let updated = engine(Arc::clone(&store))
            .submit_bid(&id, UserId::from("u1"), "Ada", 400.0)
            .await
            .unwrap();

        // The rival's bid landed first and survives alongside ours.
        assert_eq!(updated.bids.len(), 2);
        assert_eq!(updated.winning_bid.unwrap().amount, 400.0);
        assert_eq!(
            store.auction(&id).unwrap().winning_bid.unwrap().amount,
            400.0
        );
    }

    #[tokio::test]
    async fn retry_revalidates_and_rejects_when_outbid() {
        let store = Arc::new(MemoryAuctionStore::new());
        let auction = ongoing_auction();
        let id = auction.id.clone();
        store.insert(auction);
        store.queue_rival_bid(500.0);

        let err = engine(Arc::clone(&store))
            .submit_bid(&id, UserId::from("u1"), "Ada", 400.0)
            .await
            .unwrap_err();

        match err {
            EngineError::Rejected(BidRejection::NotHighest { highest }) => {
                assert_eq!(highest, 500.0)
            }
            other => panic!("expected NotHighest rejection, got {:?}", other),
        }
        // The losing bid never reached the store.
        let stored = store.auction(&id).unwrap();
        assert_eq!(stored.bids.len(), 1);
        assert_eq!(stored.winning_bid.unwrap().amount, 500.0);
    }

    #[tokio::test]
    async fn second_lost_write_is_a_conflict() {
        let store = Arc::new(MemoryAuctionStore::new());
        let auction = ongoing_auction();
        let id = auction.id.clone();
        store.insert(auction);
        store.queue_rival_bid(150.0);
        store.queue_rival_bid(160.0);

        let err = engine(Arc::clone(&store))
            .submit_bid(&id, UserId::from("u1"), "Ada", 400.0)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Conflict));
        assert_eq!(
            err.to_string(),
            "Auction was updated concurrently, please retry"
        );
    }

    #[tokio::test]
    async fn bid_on_missing_auction_is_not_found() {
        let store = Arc::new(MemoryAuctionStore::new());

        let err = engine(store)
            .submit_bid(&AuctionId::from("nope"), UserId::from("u1"), "Ada", 400.0)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::AuctionNotFound));
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            BidRejection::BelowFloor { floor: 100.0 }.to_string(),
            "Bid must be greater than the auction starting price of: NGN 100"
        );
        assert_eq!(
            BidRejection::NotOpen.to_string(),
            "Can only place a bid for an ongoing auction"
        );
        assert_eq!(
            BidRejection::NotHighest { highest: 250.0 }.to_string(),
            "Bid must be higher than the current highest bid: NGN 250"
        );
    }
}
