//! Watchlist handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use annexe_models::{Auction, AuctionId, WatchlistEntry};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWatchlistRequest {
    pub auction_id: String,
}

/// A watchlist entry hydrated with its auction, when it still exists.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction: Option<Auction>,
}

/// POST /watchlist
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddWatchlistRequest>,
) -> ApiResult<(StatusCode, Json<WatchlistEntry>)> {
    let auction_id = AuctionId::from_string(payload.auction_id);

    if state.auctions.get(&auction_id).await?.is_none() {
        return Err(ApiError::not_found("Auction not found"));
    }
    if state
        .watchlists
        .find_pair(&user.id, &auction_id)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request(
            "Auction is already in your watchlist",
        ));
    }

    let entry = WatchlistEntry::new(user.id, auction_id);
    state.watchlists.create(&entry).await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /watchlist
pub async fn list_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<WatchlistItem>>> {
    let entries = state.watchlists.list_for_user(&user.id).await?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let auction = match state.auctions.get(&entry.auction_id).await {
            Ok(auction) => auction,
            Err(e) => {
                warn!(auction_id = %entry.auction_id, "Failed to hydrate watchlist entry: {}", e);
                None
            }
        };
        items.push(WatchlistItem { entry, auction });
    }

    Ok(Json(items))
}

/// DELETE /watchlist/:id
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let entry = state
        .watchlists
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Watchlist entry not found"))?;

    if entry.user_id != user.id {
        return Err(ApiError::forbidden(
            "You can only remove your own watchlist entries",
        ));
    }

    state.watchlists.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
