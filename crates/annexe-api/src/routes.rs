//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::auctions::{
    create_auction, delete_auction, get_auction, list_auctions, submit_bid, update_auction,
};
use crate::handlers::bank::{create_subscription, list_banks, resolve_account};
use crate::handlers::health::health;
use crate::handlers::users::{
    activate, change_password, complete_registration, deactivate, forgot_password, login, me,
    register, resend_otp, reset_password, verify,
};
use crate::handlers::watchlist::{add_to_watchlist, list_watchlist, remove_from_watchlist};
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;
use crate::ws::ws_auction;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let auction_routes = Router::new()
        .route("/auction/create", post(create_auction))
        .route("/auction/all", get(list_auctions))
        .route("/auction/:id", get(get_auction))
        .route("/auction/:id", patch(update_auction))
        .route("/auction/:id", delete(delete_auction))
        // Bid submission
        .route("/auction/:id", post(submit_bid));

    let user_routes = Router::new()
        .route("/user/register", post(register))
        .route("/user/verify", post(verify))
        .route("/user/resend-otp", post(resend_otp))
        .route("/user/login", post(login))
        .route("/user/forgot-password", post(forgot_password))
        .route("/user/reset-password", post(reset_password))
        .route("/user/password", patch(change_password))
        .route("/user/complete-registration", patch(complete_registration))
        .route("/user/deactivate", patch(deactivate))
        .route("/user/activate", patch(activate))
        .route("/user/me", get(me));

    let watchlist_routes = Router::new()
        .route("/watchlist", post(add_to_watchlist))
        .route("/watchlist", get(list_watchlist))
        .route("/watchlist/:id", delete(remove_from_watchlist));

    let bank_routes = Router::new()
        .route("/bank/list", get(list_banks))
        .route("/bank/resolve", post(resolve_account))
        .route("/bank/subscription", post(create_subscription));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(auction_routes)
        .merge(user_routes)
        .merge(watchlist_routes)
        .merge(bank_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let ws_routes = Router::new().route("/ws/auction/:id", get(ws_auction));

    let health_routes = Router::new().route("/health", get(health));

    Router::new()
        .merge(api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
