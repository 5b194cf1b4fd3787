//! Auction lifecycle scheduler.
//!
//! A single background loop sweeps the store on a fixed interval and
//! moves auctions across their time boundaries: NOT_STARTED auctions
//! whose start date has passed become ONGOING, ONGOING auctions whose
//! end date has passed become CLOSED. Transitions are preconditioned on
//! the document version, so overlapping sweeps (or a second process)
//! cannot double-fire a transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use annexe_firestore::{AuctionRepository, VersionedAuction};
use annexe_models::{AuctionEvent, AuctionStatus};
use annexe_redis::{all_auctions_key, auction_key, CacheStore, EventChannel};

use crate::error::EngineResult;
use crate::store::AuctionStore;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(
                std::env::var("SCHEDULER_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Background sweeper that drives auction status transitions.
pub struct LifecycleScheduler<S = AuctionRepository> {
    auctions: Arc<S>,
    cache: Arc<CacheStore>,
    events: Arc<EventChannel>,
    config: SchedulerConfig,
}

impl<S: AuctionStore + 'static> LifecycleScheduler<S> {
    pub fn new(
        auctions: Arc<S>,
        cache: Arc<CacheStore>,
        events: Arc<EventChannel>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            auctions,
            cache,
            events,
            config,
        }
    }

    /// Spawn the sweep loop. Ticks are serialized; a slow sweep delays
    /// the next one instead of overlapping it.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(interval = ?self.config.interval, "Starting lifecycle scheduler");
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    /// One full sweep. Never fails; every error is logged and isolated
    /// to the auction that produced it.
    pub async fn tick(&self) {
        let now = Utc::now();

        match self.auctions.list_due_to_start(now).await {
            Ok(due) => {
                for snapshot in due {
                    let id = snapshot.auction.id.clone();
                    if let Err(e) = self.transition(snapshot, AuctionStatus::Ongoing).await {
                        error!(auction_id = %id, "Failed to open auction: {}", e);
                    }
                }
            }
            Err(e) => error!("Start sweep query failed: {}", e),
        }

        match self.auctions.list_due_to_end(now).await {
            Ok(due) => {
                for snapshot in due {
                    let id = snapshot.auction.id.clone();
                    if let Err(e) = self.transition(snapshot, AuctionStatus::Closed).await {
                        error!(auction_id = %id, "Failed to close auction: {}", e);
                    }
                }
            }
            Err(e) => error!("End sweep query failed: {}", e),
        }
    }

    async fn transition(
        &self,
        snapshot: VersionedAuction,
        next: AuctionStatus,
    ) -> EngineResult<()> {
        let id = snapshot.auction.id.clone();

        let auction = match self
            .auctions
            .transition_status(&id, next, &snapshot.version)
            .await
        {
            Ok(auction) => auction,
            Err(e) if e.is_precondition_failed() => {
                // Another sweep got there first.
                debug!(auction_id = %id, status = %next, "Transition already applied");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        info!(auction_id = %id, status = %next, "Auction transitioned");

        if let Err(e) = self.cache.set(&auction_key(id.as_str()), &auction).await {
            warn!(auction_id = %id, "Failed to refresh auction cache: {}", e);
        }
        if let Err(e) = self.cache.delete(all_auctions_key()).await {
            warn!("Failed to invalidate listing cache: {}", e);
        }

        let event = match next {
            AuctionStatus::Ongoing => AuctionEvent::Started(auction),
            _ => AuctionEvent::Ended(auction),
        };
        if let Err(e) = self.events.publish_lifecycle(&event).await {
            warn!(auction_id = %id, "Failed to publish lifecycle event: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use annexe_models::{Auction, UserId};
    use annexe_redis::CacheConfig;

    use super::*;
    use crate::store::testing::MemoryAuctionStore;

    #[test]
    fn default_interval_is_a_minute() {
        assert_eq!(SchedulerConfig::default().interval, Duration::from_secs(60));
    }

    // Cache and pub/sub aim at a closed port; both legs are best effort
    // and only log on failure.
    fn scheduler(store: Arc<MemoryAuctionStore>) -> LifecycleScheduler<MemoryAuctionStore> {
        let cache = Arc::new(
            CacheStore::new(CacheConfig {
                redis_url: "redis://127.0.0.1:1".to_string(),
                ..CacheConfig::default()
            })
            .unwrap(),
        );
        let events = Arc::new(EventChannel::new("redis://127.0.0.1:1").unwrap());
        LifecycleScheduler::new(store, cache, events, SchedulerConfig::default())
    }

    fn auction_between(start_hours: i64, end_hours: i64) -> Auction {
        let now = Utc::now();
        Auction::new(
            UserId::from("creator"),
            "Brass lamp",
            "Art deco table lamp",
            50.0,
            now + ChronoDuration::hours(start_hours),
            now + ChronoDuration::hours(end_hours),
        )
    }

    #[tokio::test]
    async fn tick_opens_and_closes_due_auctions() {
        let store = Arc::new(MemoryAuctionStore::new());

        let due_open = auction_between(-1, 23);
        let not_due = auction_between(2, 26);
        let mut due_close = auction_between(-26, -1);
        due_close.start().unwrap();

        let open_id = due_open.id.clone();
        let idle_id = not_due.id.clone();
        let close_id = due_close.id.clone();
        store.insert(due_open);
        store.insert(not_due);
        store.insert(due_close);

        scheduler(Arc::clone(&store)).tick().await;

        assert_eq!(
            store.auction(&open_id).unwrap().status,
            AuctionStatus::Ongoing
        );
        assert_eq!(
            store.auction(&idle_id).unwrap().status,
            AuctionStatus::NotStarted
        );
        assert_eq!(
            store.auction(&close_id).unwrap().status,
            AuctionStatus::Closed
        );
    }

    #[tokio::test]
    async fn tick_isolates_failures_to_one_auction() {
        let store = Arc::new(MemoryAuctionStore::new());

        let broken = auction_between(-2, 22);
        let healthy = auction_between(-1, 23);
        let broken_id = broken.id.clone();
        let healthy_id = healthy.id.clone();
        store.insert(broken);
        store.insert(healthy);
        store.break_transitions(&broken_id);

        scheduler(Arc::clone(&store)).tick().await;

        assert_eq!(
            store.auction(&broken_id).unwrap().status,
            AuctionStatus::NotStarted
        );
        assert_eq!(
            store.auction(&healthy_id).unwrap().status,
            AuctionStatus::Ongoing
        );
    }

    #[tokio::test]
    async fn lost_transition_race_reads_as_already_applied() {
        let store = Arc::new(MemoryAuctionStore::new());

        let auction = auction_between(-1, 23);
        let id = auction.id.clone();
        store.insert(auction);
        store.race_transition(&id);

        // The sweep treats the lost precondition as another sweeper's
        // win and finishes cleanly.
        scheduler(Arc::clone(&store)).tick().await;

        assert_eq!(
            store.auction(&id).unwrap().status,
            AuctionStatus::NotStarted
        );
    }
}
