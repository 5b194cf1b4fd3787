//! Live events via Redis Pub/Sub.
//!
//! Two surfaces: per-auction bid broadcasts consumed by websocket
//! handlers, and the lifecycle channel consumed by the notification
//! worker.

use std::pin::Pin;

use futures::Stream;
use redis::AsyncCommands;
use tracing::debug;

use annexe_models::{AuctionEvent, AuctionId, WsMessage};

use crate::error::CacheResult;

/// Lifecycle events travel on a single shared channel.
const LIFECYCLE_CHANNEL: &str = "auction:lifecycle";

/// Pub/sub channel handle.
pub struct EventChannel {
    client: redis::Client,
}

impl EventChannel {
    pub fn new(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    /// Channel name for one auction's live bid feed.
    pub fn bid_channel(auction_id: &AuctionId) -> String {
        format!("live:auction:{}", auction_id)
    }

    /// Publish an accepted bid to the auction's room.
    pub async fn publish_bid(&self, auction_id: &AuctionId, message: &WsMessage) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::bid_channel(auction_id);
        let payload = serde_json::to_string(message)?;

        debug!("Publishing bid event to {}", channel);
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    /// Subscribe to one auction's live bid feed.
    pub async fn subscribe_bids(
        &self,
        auction_id: &AuctionId,
    ) -> CacheResult<Pin<Box<dyn Stream<Item = WsMessage> + Send>>> {
        use futures::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::bid_channel(auction_id)).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }

    /// Publish a lifecycle transition.
    pub async fn publish_lifecycle(&self, event: &AuctionEvent) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(event)?;

        debug!(
            auction_id = %event.auction_id(),
            transition = event.transition(),
            "Publishing lifecycle event"
        );
        conn.publish::<_, _, ()>(LIFECYCLE_CHANNEL, payload).await?;
        Ok(())
    }

    /// Subscribe to all lifecycle transitions.
    pub async fn subscribe_lifecycle(
        &self,
    ) -> CacheResult<Pin<Box<dyn Stream<Item = AuctionEvent> + Send>>> {
        use futures::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(LIFECYCLE_CHANNEL).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_channel_name() {
        assert_eq!(
            EventChannel::bid_channel(&AuctionId::from("a1")),
            "live:auction:a1"
        );
    }
}
