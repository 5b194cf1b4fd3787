//! WebSocket handlers.
//!
//! Clients open `/ws/auction/:id` to receive `new bid` events for one
//! auction room. The socket is broadcast-only; anything the client
//! sends besides close/ping is ignored.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use annexe_models::AuctionId;

use crate::state::AppState;

/// GET /ws/auction/:id
pub async fn ws_auction(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let auction_id = AuctionId::from_string(id);
    ws.on_upgrade(move |socket| handle_auction_socket(socket, state, auction_id))
}

async fn handle_auction_socket(socket: WebSocket, state: AppState, auction_id: AuctionId) {
    info!(auction_id = %auction_id, "WebSocket subscriber connected");

    let (mut sender, mut receiver) = socket.split();

    let mut events = match state.events.subscribe_bids(&auction_id).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(auction_id = %auction_id, "Failed to subscribe to bid feed: {}", e);
            let _ = sender.close().await;
            return;
        }
    };

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(message) = event else { break };
                let json = match serde_json::to_string(&message) {
                    Ok(j) => j,
                    Err(_) => continue,
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    debug!(auction_id = %auction_id, "WebSocket send failed, client disconnected");
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    info!(auction_id = %auction_id, "WebSocket subscriber disconnected");
}
