//! Lifecycle notification dispatch.
//!
//! Consumes `auction.started` and `auction.ended` events from the
//! lifecycle channel and mails the interested parties: every watcher
//! when an auction opens, the winner when it closes. A short-lived
//! Redis marker keyed on (auction, transition) keeps a redelivered
//! event from mailing twice.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};

use annexe_firestore::{UserRepository, WatchlistRepository};
use annexe_mail::MailClient;
use annexe_models::{Auction, AuctionEvent};
use annexe_redis::{CacheStore, EventChannel};

use crate::error::WorkerResult;

/// Dedup markers outlive any plausible redelivery window.
const DEDUP_TTL: Duration = Duration::from_secs(24 * 3600);

fn dedup_key(event: &AuctionEvent) -> String {
    format!("notified:{}:{}", event.auction_id(), event.transition())
}

pub struct Notifier {
    users: Arc<UserRepository>,
    watchlists: Arc<WatchlistRepository>,
    mail: Arc<MailClient>,
    cache: Arc<CacheStore>,
    events: Arc<EventChannel>,
}

impl Notifier {
    pub fn new(
        users: Arc<UserRepository>,
        watchlists: Arc<WatchlistRepository>,
        mail: Arc<MailClient>,
        cache: Arc<CacheStore>,
        events: Arc<EventChannel>,
    ) -> Self {
        Self {
            users,
            watchlists,
            mail,
            cache,
            events,
        }
    }

    /// Consume lifecycle events until the subscription ends.
    pub async fn run(&self) -> WorkerResult<()> {
        let mut stream = self.events.subscribe_lifecycle().await?;
        info!("Listening for lifecycle events");

        while let Some(event) = stream.next().await {
            self.handle(&event).await;
        }

        warn!("Lifecycle subscription ended");
        Ok(())
    }

    /// Process one event. Failures are logged, never fatal to the loop.
    pub async fn handle(&self, event: &AuctionEvent) {
        match self.cache.set_if_absent(&dedup_key(event), DEDUP_TTL).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    auction_id = %event.auction_id(),
                    transition = event.transition(),
                    "Event already handled, skipping"
                );
                return;
            }
            Err(e) => {
                // Proceed without the marker rather than drop the mail.
                warn!("Dedup marker check failed: {}", e);
            }
        }

        let result = match event {
            AuctionEvent::Started(auction) => self.notify_watchers(auction).await,
            AuctionEvent::Ended(auction) => self.notify_winner(auction).await,
        };

        if let Err(e) = result {
            warn!(
                auction_id = %event.auction_id(),
                transition = event.transition(),
                "Notification dispatch failed: {}",
            e);
        }
    }

    /// Mail every watcher that the auction has opened.
    async fn notify_watchers(&self, auction: &Auction) -> WorkerResult<()> {
        let watchers = self.watchlists.list_for_auction(&auction.id).await?;
        info!(
            auction_id = %auction.id,
            watchers = watchers.len(),
            "Notifying watchers of auction start"
        );

        for entry in watchers {
            let user = match self.users.get(&entry.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(user_id = %entry.user_id, "Watcher no longer exists");
                    continue;
                }
                Err(e) => {
                    warn!(user_id = %entry.user_id, "Failed to load watcher: {}", e);
                    continue;
                }
            };

            if let Err(e) = self.mail.send_auction_started(&user, auction).await {
                warn!(
                    user_id = %user.id,
                    auction_id = %auction.id,
                    "Failed to mail watcher: {}",
                    e
                );
            }
        }

        Ok(())
    }

    /// Mail the winner, when the auction closed with a winning bid.
    async fn notify_winner(&self, auction: &Auction) -> WorkerResult<()> {
        let Some(winning_bid) = &auction.winning_bid else {
            info!(auction_id = %auction.id, "Auction ended without bids");
            return Ok(());
        };

        let winner = match self.users.get(&winning_bid.bid_owner).await? {
            Some(user) => user,
            None => {
                warn!(
                    user_id = %winning_bid.bid_owner,
                    auction_id = %auction.id,
                    "Winner no longer exists"
                );
                return Ok(());
            }
        };

        info!(
            auction_id = %auction.id,
            winner = %winner.id,
            amount = winning_bid.amount,
            "Notifying auction winner"
        );
        self.mail.send_auction_winner(&winner, auction).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annexe_models::UserId;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn dedup_key_includes_transition() {
        let now = Utc::now();
        let auction = Auction::new(
            UserId::from("c1"),
            "Lamp",
            "Brass desk lamp",
            50.0,
            now,
            now + ChronoDuration::hours(1),
        );
        let id = auction.id.clone();

        let started = AuctionEvent::Started(auction.clone());
        let ended = AuctionEvent::Ended(auction);

        assert_eq!(dedup_key(&started), format!("notified:{}:started", id));
        assert_eq!(dedup_key(&ended), format!("notified:{}:ended", id));
        assert_ne!(dedup_key(&started), dedup_key(&ended));
    }
}
