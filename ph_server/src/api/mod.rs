//! HTTP/WebSocket surface of the gateway.
//!
//! The API is deliberately thin: one WebSocket endpoint carrying the whole
//! game protocol, plus a health probe. Everything stateful lives behind
//! the [`RoomManager`].
//!
//! # Endpoints
//!
//! - `GET /ws` — upgrade to the game protocol WebSocket
//! - `GET /health` — liveness probe with the live room count

pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use pocket_holdem::room::RoomManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state, cloned per connection.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomManager>,
}

/// Build the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.rooms.room_count().await;
    Json(json!({
        "status": "ok",
        "rooms": rooms,
    }))
}
