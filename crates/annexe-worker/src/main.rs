//! Notification worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use annexe_firestore::{FirestoreClient, UserRepository, WatchlistRepository};
use annexe_mail::MailClient;
use annexe_redis::{CacheStore, EventChannel};
use annexe_worker::Notifier;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("annexe=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting annexe-worker");

    let firestore = match FirestoreClient::from_env().await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Firestore client: {}", e);
            std::process::exit(1);
        }
    };
    let users = Arc::new(UserRepository::new(firestore.clone()));
    let watchlists = Arc::new(WatchlistRepository::new(firestore));

    let mail = match MailClient::from_env() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!("Failed to create mail client: {}", e);
            std::process::exit(1);
        }
    };
    let cache = match CacheStore::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create cache store: {}", e);
            std::process::exit(1);
        }
    };
    let events = match EventChannel::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create event channel: {}", e);
            std::process::exit(1);
        }
    };

    let notifier = Notifier::new(users, watchlists, mail, cache, events);

    tokio::select! {
        result = notifier.run() => {
            if let Err(e) = result {
                error!("Notifier error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Worker shutdown complete");
}
