//! HTTP surface wiring: routes, middleware layers, and the socket upgrade.

pub mod config;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use nocturne_api::{ApiError, AppState, limits, lobby, room, status};
use nocturne_gateway::connection;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/join", post(lobby::join))
        .route("/api/leave", post(lobby::leave))
        .route("/api/match", post(lobby::attempt_match))
        .route("/api/end", post(room::end))
        .route("/api/limit", post(limits::limit))
        .route("/api/status", get(status::status))
        .route("/api/rooms/{room_id}", get(room::room_status))
        .route("/api/rooms/{room_id}/socket", get(socket_upgrade))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Deserialize)]
struct SocketQuery {
    token: String,
}

/// Upgrade gate for a room socket. Membership is checked before the
/// upgrade, so a stranger never reaches the relay. An ended room still
/// accepts connections; the poll tells the client what happened.
async fn socket_upgrade(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let id = room_id.to_string();
    let membership = tokio::task::spawn_blocking(move || db.get_room_membership(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let Some(membership) = membership else {
        return Err(ApiError::RoomNotFound);
    };
    if query.token != membership.token_a && query.token != membership.token_b {
        return Err(ApiError::NotAParticipant);
    }

    Ok(ws.on_upgrade(move |socket| {
        connection::handle_room_connection(
            socket,
            state.dispatcher.clone(),
            state.db.clone(),
            state.clock.clone(),
            room_id,
            query.token,
        )
    }))
}
