//! Application state.

use std::sync::Arc;

use annexe_engine::BiddingEngine;
use annexe_firestore::{
    AuctionRepository, FirestoreClient, OtpRepository, UserRepository, WatchlistRepository,
};
use annexe_mail::MailClient;
use annexe_paystack::PaystackClient;
use annexe_redis::{CacheStore, EventChannel};

use crate::config::ApiConfig;
use crate::services::UserService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub auctions: Arc<AuctionRepository>,
    pub users: Arc<UserRepository>,
    pub watchlists: Arc<WatchlistRepository>,
    pub cache: Arc<CacheStore>,
    pub events: Arc<EventChannel>,
    pub paystack: Arc<PaystackClient>,
    pub engine: BiddingEngine,
    pub user_service: UserService,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let firestore = FirestoreClient::from_env().await?;

        let auctions = Arc::new(AuctionRepository::new(firestore.clone()));
        let users = Arc::new(UserRepository::new(firestore.clone()));
        let otps = Arc::new(OtpRepository::new(firestore.clone()));
        let watchlists = Arc::new(WatchlistRepository::new(firestore));

        let cache = Arc::new(CacheStore::from_env()?);
        let events = Arc::new(EventChannel::from_env()?);

        let mail = Arc::new(MailClient::from_env()?);
        let paystack = Arc::new(PaystackClient::from_env()?);

        let engine = BiddingEngine::new(
            Arc::clone(&auctions),
            Arc::clone(&cache),
            Arc::clone(&events),
        );

        let user_service = UserService::new(
            Arc::clone(&users),
            otps,
            Arc::clone(&mail),
            Arc::clone(&paystack),
            config.clone(),
        );

        Ok(Self {
            config,
            auctions,
            users,
            watchlists,
            cache,
            events,
            paystack,
            engine,
            user_service,
        })
    }
}
