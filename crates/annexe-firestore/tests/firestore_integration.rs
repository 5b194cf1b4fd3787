//! Firestore integration tests.
//!
//! Run against a live project:
//!   cargo test -p annexe-firestore -- --ignored

use annexe_firestore::{AuctionRepository, FirestoreClient};
use annexe_models::{Auction, AuctionStatus, Bid, UserId};
use chrono::{Duration, Utc};

fn sample_auction() -> Auction {
    let now = Utc::now();
    Auction::new(
        UserId::from("integration-test-user"),
        "Integration test item",
        "Created by firestore_integration tests",
        100.0,
        now + Duration::hours(1),
        now + Duration::hours(25),
    )
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn auction_crud_round_trip() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env()
        .await
        .expect("Failed to create Firestore client");
    let repo = AuctionRepository::new(client);

    let auction = sample_auction();
    repo.create(&auction).await.expect("create failed");

    let fetched = repo
        .get(&auction.id)
        .await
        .expect("get failed")
        .expect("auction missing after create");
    assert_eq!(fetched.product_name, auction.product_name);
    assert_eq!(fetched.status, AuctionStatus::NotStarted);

    repo.delete(&auction.id).await.expect("delete failed");
    let gone = repo.get(&auction.id).await.expect("get failed");
    assert!(gone.is_none());
}

#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn stale_version_write_is_rejected() {
    dotenvy::dotenv().ok();

    let client = FirestoreClient::from_env()
        .await
        .expect("Failed to create Firestore client");
    let repo = AuctionRepository::new(client);

    let auction = sample_auction();
    repo.create(&auction).await.expect("create failed");

    let snapshot = repo
        .get_versioned(&auction.id)
        .await
        .expect("get failed")
        .expect("auction missing");

    // First write against the snapshot succeeds and bumps updateTime.
    let bid = Bid::new(UserId::from("bidder-1"), 150.0);
    repo.apply_bid(&auction.id, &[bid.clone()], &bid, &snapshot.version)
        .await
        .expect("first write failed");

    // Second write against the same, now stale, version must lose.
    let late = Bid::new(UserId::from("bidder-2"), 160.0);
    let result = repo
        .apply_bid(&auction.id, &[late.clone()], &late, &snapshot.version)
        .await;
    match result {
        Err(e) => assert!(e.is_precondition_failed(), "unexpected error: {e}"),
        Ok(_) => panic!("stale write was accepted"),
    }

    repo.delete(&auction.id).await.expect("cleanup failed");
}
