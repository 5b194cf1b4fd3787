//! Storage seam for the engine.
//!
//! The engine drives a narrow slice of auction storage: versioned reads,
//! the two preconditioned writes, and the sweep queries.
//! `AuctionRepository` is the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use annexe_firestore::{AuctionRepository, FirestoreResult, VersionedAuction};
use annexe_models::{Auction, AuctionId, AuctionStatus, Bid};

#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn get_versioned(&self, id: &AuctionId) -> FirestoreResult<Option<VersionedAuction>>;

    async fn apply_bid(
        &self,
        id: &AuctionId,
        bids: &[Bid],
        winning_bid: &Bid,
        version: &str,
    ) -> FirestoreResult<Auction>;

    async fn transition_status(
        &self,
        id: &AuctionId,
        status: AuctionStatus,
        version: &str,
    ) -> FirestoreResult<Auction>;

    async fn list_due_to_start(&self, now: DateTime<Utc>)
        -> FirestoreResult<Vec<VersionedAuction>>;

    async fn list_due_to_end(&self, now: DateTime<Utc>) -> FirestoreResult<Vec<VersionedAuction>>;
}

#[async_trait]
impl AuctionStore for AuctionRepository {
    async fn get_versioned(&self, id: &AuctionId) -> FirestoreResult<Option<VersionedAuction>> {
        AuctionRepository::get_versioned(self, id).await
    }

    async fn apply_bid(
        &self,
        id: &AuctionId,
        bids: &[Bid],
        winning_bid: &Bid,
        version: &str,
    ) -> FirestoreResult<Auction> {
        AuctionRepository::apply_bid(self, id, bids, winning_bid, version).await
    }

    async fn transition_status(
        &self,
        id: &AuctionId,
        status: AuctionStatus,
        version: &str,
    ) -> FirestoreResult<Auction> {
        AuctionRepository::transition_status(self, id, status, version).await
    }

    async fn list_due_to_start(
        &self,
        now: DateTime<Utc>,
    ) -> FirestoreResult<Vec<VersionedAuction>> {
        AuctionRepository::list_due_to_start(self, now).await
    }

    async fn list_due_to_end(&self, now: DateTime<Utc>) -> FirestoreResult<Vec<VersionedAuction>> {
        AuctionRepository::list_due_to_end(self, now).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store with version counters and write-race injection.

    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    use annexe_firestore::FirestoreError;
    use annexe_models::UserId;

    use super::*;

    #[derive(Default)]
    pub(crate) struct MemoryAuctionStore {
        docs: Mutex<HashMap<String, (Auction, u64)>>,
        rival_bids: Mutex<VecDeque<f64>>,
        broken_transitions: Mutex<HashSet<String>>,
        raced_transitions: Mutex<HashSet<String>>,
    }

    impl MemoryAuctionStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, auction: Auction) {
            self.docs
                .lock()
                .unwrap()
                .insert(auction.id.as_str().to_string(), (auction, 1));
        }

        pub fn auction(&self, id: &AuctionId) -> Option<Auction> {
            self.docs
                .lock()
                .unwrap()
                .get(id.as_str())
                .map(|(a, _)| a.clone())
        }

        /// Each queued amount makes one `apply_bid` land behind a
        /// competing write and lose its precondition.
        pub fn queue_rival_bid(&self, amount: f64) {
            self.rival_bids.lock().unwrap().push_back(amount);
        }

        /// Every transition for this auction fails outright.
        pub fn break_transitions(&self, id: &AuctionId) {
            self.broken_transitions
                .lock()
                .unwrap()
                .insert(id.as_str().to_string());
        }

        /// The next transition for this auction loses its precondition.
        pub fn race_transition(&self, id: &AuctionId) {
            self.raced_transitions
                .lock()
                .unwrap()
                .insert(id.as_str().to_string());
        }
    }

    fn stale_write() -> FirestoreError {
        FirestoreError::PreconditionFailed("updateTime mismatch".to_string())
    }

    #[async_trait]
    impl AuctionStore for MemoryAuctionStore {
        async fn get_versioned(
            &self,
            id: &AuctionId,
        ) -> FirestoreResult<Option<VersionedAuction>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .get(id.as_str())
                .map(|(a, v)| VersionedAuction {
                    auction: a.clone(),
                    version: v.to_string(),
                }))
        }

        async fn apply_bid(
            &self,
            id: &AuctionId,
            bids: &[Bid],
            winning_bid: &Bid,
            version: &str,
        ) -> FirestoreResult<Auction> {
            if let Some(amount) = self.rival_bids.lock().unwrap().pop_front() {
                let mut docs = self.docs.lock().unwrap();
                if let Some((auction, v)) = docs.get_mut(id.as_str()) {
                    auction.apply_bid(Bid::new(UserId::from("rival"), amount));
                    *v += 1;
                }
                return Err(stale_write());
            }

            let mut docs = self.docs.lock().unwrap();
            let (auction, v) = docs
                .get_mut(id.as_str())
                .ok_or_else(|| FirestoreError::not_found(id.as_str()))?;
            if v.to_string() != version {
                return Err(stale_write());
            }
            auction.bids = bids.to_vec();
            auction.winning_bid = Some(winning_bid.clone());
            auction.updated_at = Utc::now();
            *v += 1;
            Ok(auction.clone())
        }

        async fn transition_status(
            &self,
            id: &AuctionId,
            status: AuctionStatus,
            version: &str,
        ) -> FirestoreResult<Auction> {
            if self
                .broken_transitions
                .lock()
                .unwrap()
                .contains(id.as_str())
            {
                return Err(FirestoreError::Server("backend unavailable".to_string()));
            }
            if self.raced_transitions.lock().unwrap().remove(id.as_str()) {
                return Err(stale_write());
            }

            let mut docs = self.docs.lock().unwrap();
            let (auction, v) = docs
                .get_mut(id.as_str())
                .ok_or_else(|| FirestoreError::not_found(id.as_str()))?;
            if v.to_string() != version {
                return Err(stale_write());
            }
            auction.status = status;
            auction.updated_at = Utc::now();
            *v += 1;
            Ok(auction.clone())
        }

        async fn list_due_to_start(
            &self,
            now: DateTime<Utc>,
        ) -> FirestoreResult<Vec<VersionedAuction>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .values()
                .filter(|(a, _)| a.status == AuctionStatus::NotStarted && a.start_date <= now)
                .map(|(a, v)| VersionedAuction {
                    auction: a.clone(),
                    version: v.to_string(),
                })
                .collect())
        }

        async fn list_due_to_end(
            &self,
            now: DateTime<Utc>,
        ) -> FirestoreResult<Vec<VersionedAuction>> {
            Ok(self
                .docs
                .lock()
                .unwrap()
                .values()
                .filter(|(a, _)| a.status == AuctionStatus::Ongoing && a.end_date <= now)
                .map(|(a, v)| VersionedAuction {
                    auction: a.clone(),
                    version: v.to_string(),
                })
                .collect())
        }
    }
}
