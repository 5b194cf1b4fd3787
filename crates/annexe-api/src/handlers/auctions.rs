//! Auction handlers.
//!
//! Reads go through the Redis cache when it cooperates; the store is
//! always the source of truth and cache trouble is only logged.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use annexe_models::{Auction, AuctionId, Bid};
use annexe_redis::{all_auctions_key, auction_key};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub product_name: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "Starting price cannot be negative"))]
    pub starting_price: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuctionRequest {
    #[validate(length(min = 1, message = "Product name cannot be empty"))]
    pub product_name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Starting price cannot be negative"))]
    pub starting_price: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub main_image: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub amount: f64,
}

/// Shared schedule checks. The future-start rule applies on create and
/// whenever a request reschedules the start.
fn check_schedule(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
    start_must_be_upcoming: bool,
) -> Result<(), ApiError> {
    if start_must_be_upcoming && start_date < now {
        return Err(ApiError::bad_request("Start date cannot be in the past"));
    }
    if end_date <= start_date {
        return Err(ApiError::bad_request("End date must be after start date"));
    }
    Ok(())
}

/// POST /auction/create
pub async fn create_auction(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateAuctionRequest>,
) -> ApiResult<(StatusCode, Json<Auction>)> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    check_schedule(payload.start_date, payload.end_date, Utc::now(), true)?;

    let mut auction = Auction::new(
        user.id,
        payload.product_name,
        payload.description,
        payload.starting_price,
        payload.start_date,
        payload.end_date,
    );
    auction.main_image = payload.main_image;
    auction.images = payload.images;

    state.auctions.create(&auction).await?;

    if let Err(e) = state.cache.delete(all_auctions_key()).await {
        warn!("Failed to invalidate listing cache: {}", e);
    }

    Ok((StatusCode::CREATED, Json(auction)))
}

/// GET /auction/all
pub async fn list_auctions(State(state): State<AppState>) -> ApiResult<Json<Vec<Auction>>> {
    match state.cache.get::<Vec<Auction>>(all_auctions_key()).await {
        Ok(Some(auctions)) => return Ok(Json(auctions)),
        Ok(None) => {}
        Err(e) => warn!("Listing cache read failed: {}", e),
    }

    let auctions = state.auctions.list_all().await?;

    if let Err(e) = state.cache.set(all_auctions_key(), &auctions).await {
        warn!("Failed to populate listing cache: {}", e);
    }
    Ok(Json(auctions))
}

/// GET /auction/:id
pub async fn get_auction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Auction>> {
    let key = auction_key(&id);
    match state.cache.get::<Auction>(&key).await {
        Ok(Some(auction)) => return Ok(Json(auction)),
        Ok(None) => {}
        Err(e) => warn!(auction_id = %id, "Auction cache read failed: {}", e),
    }

    let auction_id = AuctionId::from_string(id);
    let auction = state
        .auctions
        .get(&auction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Auction not found"))?;

    if let Err(e) = state.cache.set(&key, &auction).await {
        warn!(auction_id = %auction_id, "Failed to populate auction cache: {}", e);
    }
    Ok(Json(auction))
}

/// PATCH /auction/:id
pub async fn update_auction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAuctionRequest>,
) -> ApiResult<Json<Auction>> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let auction_id = AuctionId::from_string(id);
    let snapshot = state
        .auctions
        .get_versioned(&auction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Auction not found"))?;

    let mut auction = snapshot.auction;
    if auction.creator_id != user.id {
        return Err(ApiError::unauthorized(
            "You can only modify your own auctions",
        ));
    }
    if !auction.is_mutable() {
        return Err(ApiError::bad_request(
            "Cannot modify an auction that is ongoing",
        ));
    }

    let rescheduled = payload.start_date.is_some();
    if let Some(product_name) = payload.product_name {
        auction.product_name = product_name;
    }
    if let Some(description) = payload.description {
        auction.description = description;
    }
    if let Some(starting_price) = payload.starting_price {
        auction.starting_price = starting_price;
    }
    if let Some(start_date) = payload.start_date {
        auction.start_date = start_date;
    }
    if let Some(end_date) = payload.end_date {
        auction.end_date = end_date;
    }
    if let Some(main_image) = payload.main_image {
        auction.main_image = Some(main_image);
    }
    if let Some(images) = payload.images {
        auction.images = images;
    }
    check_schedule(auction.start_date, auction.end_date, Utc::now(), rescheduled)?;

    let updated = state
        .auctions
        .update_details(&auction, &snapshot.version)
        .await?;

    if let Err(e) = state.cache.set(&auction_key(updated.id.as_str()), &updated).await {
        warn!(auction_id = %updated.id, "Failed to refresh auction cache: {}", e);
    }
    if let Err(e) = state.cache.delete(all_auctions_key()).await {
        warn!("Failed to invalidate listing cache: {}", e);
    }

    Ok(Json(updated))
}

/// DELETE /auction/:id
pub async fn delete_auction(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let auction_id = AuctionId::from_string(id);
    let auction = state
        .auctions
        .get(&auction_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Auction not found"))?;

    if auction.creator_id != user.id {
        return Err(ApiError::unauthorized(
            "You can only delete your own auctions",
        ));
    }
    if !auction.is_mutable() {
        return Err(ApiError::bad_request(
            "Cannot delete an auction that is ongoing",
        ));
    }

    state.auctions.delete(&auction_id).await?;

    if let Err(e) = state.cache.delete(&auction_key(auction_id.as_str())).await {
        warn!(auction_id = %auction_id, "Failed to drop auction cache entry: {}", e);
    }
    if let Err(e) = state.cache.delete(all_auctions_key()).await {
        warn!("Failed to invalidate listing cache: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /auction/:id (submit a bid)
pub async fn submit_bid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<BidRequest>,
) -> ApiResult<(StatusCode, Json<Bid>)> {
    let auction_id = AuctionId::from_string(id);
    let auction = state
        .engine
        .submit_bid(&auction_id, user.id, &user.name, payload.amount)
        .await?;

    let bid = auction
        .winning_bid
        .ok_or_else(|| ApiError::internal("Accepted bid missing from auction"))?;
    Ok((StatusCode::CREATED, Json(bid)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn schedule_rejects_past_start_when_rescheduling() {
        let now = Utc::now();
        let start = now - Duration::hours(1);
        let end = now + Duration::hours(23);

        let err = check_schedule(start, end, now, true).unwrap_err();
        assert_eq!(err.to_string(), "Start date cannot be in the past");

        // A start date the request did not touch stays patchable.
        assert!(check_schedule(start, end, now, false).is_ok());
    }

    #[test]
    fn schedule_requires_end_after_start() {
        let now = Utc::now();
        let start = now + Duration::hours(2);

        let err = check_schedule(start, start, now, true).unwrap_err();
        assert_eq!(err.to_string(), "End date must be after start date");
    }
}
