//! Redis integration tests.
//!
//! Run against a live Redis:
//!   cargo test -p annexe-redis -- --ignored

use std::time::Duration;

use annexe_models::{AuctionId, Bid, UserId, WsMessage};
use annexe_redis::{CacheStore, EventChannel};
use futures::StreamExt;

#[tokio::test]
#[ignore = "requires Redis"]
async fn cache_set_get_delete() {
    dotenvy::dotenv().ok();

    let cache = CacheStore::from_env().expect("Failed to create cache store");
    let key = format!("test:cache:{}", uuid::Uuid::new_v4());

    cache.set(&key, &vec![1, 2, 3]).await.expect("set failed");
    let value: Option<Vec<i32>> = cache.get(&key).await.expect("get failed");
    assert_eq!(value, Some(vec![1, 2, 3]));

    cache.delete(&key).await.expect("delete failed");
    let value: Option<Vec<i32>> = cache.get(&key).await.expect("get failed");
    assert_eq!(value, None);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn set_if_absent_is_exclusive() {
    dotenvy::dotenv().ok();

    let cache = CacheStore::from_env().expect("Failed to create cache store");
    let key = format!("test:marker:{}", uuid::Uuid::new_v4());

    let first = cache
        .set_if_absent(&key, Duration::from_secs(30))
        .await
        .expect("first marker failed");
    let second = cache
        .set_if_absent(&key, Duration::from_secs(30))
        .await
        .expect("second marker failed");

    assert!(first);
    assert!(!second);

    cache.delete(&key).await.expect("cleanup failed");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn bid_broadcast_round_trip() {
    dotenvy::dotenv().ok();

    let channel = EventChannel::from_env().expect("Failed to create event channel");
    let auction_id = AuctionId::new();

    let mut stream = channel
        .subscribe_bids(&auction_id)
        .await
        .expect("subscribe failed");

    // Give the subscription a moment to register.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let bid = Bid::new(UserId::from("test-user"), 150.0);
    let message = WsMessage::new_bid(auction_id.clone(), &bid, "Test User");
    channel
        .publish_bid(&auction_id, &message)
        .await
        .expect("publish failed");

    let received = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for bid event")
        .expect("stream ended");

    let WsMessage::NewBid { amount, bidder_name, .. } = received;
    assert_eq!(amount, 150.0);
    assert_eq!(bidder_name, "Test User");
}
