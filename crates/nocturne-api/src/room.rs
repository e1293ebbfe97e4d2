//! Session termination and the authoritative room status poll.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use nocturne_types::SELF_END_CAP;
use nocturne_types::api::{EndRequest, EndResponse, EndTrigger, RoomStatusResponse};
use nocturne_types::fmt_ts;
use nocturne_types::models::Side;

use crate::error::{ApiError, join_error};
use crate::state::AppState;

/// End a room. Idempotent: ending an already-ended room succeeds without
/// touching anything. A user end spends one of the caller's nightly
/// self-ends; a system end is the hard-close path and is exempt.
pub async fn end(
    State(state): State<AppState>,
    Json(req): Json<EndRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now_utc();
    let room_id = req.room_id.to_string();

    let db = state.db.clone();
    let rid = room_id.clone();
    let membership = tokio::task::spawn_blocking(move || db.get_room_membership(&rid))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::RoomNotFound)?;

    // Already ended beats everything else, membership included: the caller
    // learns the terminal state and moves on.
    if membership.room.ended_at.is_some() {
        return Ok(Json(EndResponse {
            ok: true,
            ended: true,
            self_end_count: None,
        }));
    }

    let side = if membership.token_a == req.token {
        Side::A
    } else if membership.token_b == req.token {
        Side::B
    } else {
        return Err(ApiError::NotAParticipant);
    };

    match req.trigger {
        EndTrigger::System => {
            let db = state.db.clone();
            let rid = room_id.clone();
            let ts = fmt_ts(now);
            // Concurrent hard-close calls race here; whoever loses still
            // sees the room ended, which is all that matters.
            tokio::task::spawn_blocking(move || db.end_room(&rid, &ts, None, None))
                .await
                .map_err(join_error)??;

            info!("room:{} ended by the clock", room_id);
            Ok(Json(EndResponse {
                ok: true,
                ended: true,
                self_end_count: None,
            }))
        }
        EndTrigger::User => {
            let date = state.schedule.night_date(now).to_string();

            // Pre-check so a capped-out caller cannot end the room at all.
            let db = state.db.clone();
            let token = req.token.clone();
            let date_pre = date.clone();
            let count = tokio::task::spawn_blocking(move || db.night_count(&token, &date_pre))
                .await
                .map_err(join_error)??;
            if count >= SELF_END_CAP {
                return Err(ApiError::LimitReached);
            }

            let db = state.db.clone();
            let rid = room_id.clone();
            let ts = fmt_ts(now);
            let token = req.token.clone();
            let ended_now = tokio::task::spawn_blocking(move || {
                db.end_room(&rid, &ts, Some(&token), Some(side.as_str()))
            })
            .await
            .map_err(join_error)??;

            if !ended_now {
                // Somebody got there between our load and our write.
                return Ok(Json(EndResponse {
                    ok: true,
                    ended: true,
                    self_end_count: None,
                }));
            }

            info!("room:{} ended by side {}", room_id, side);

            let db = state.db.clone();
            let token = req.token.clone();
            let new_count = tokio::task::spawn_blocking(move || {
                db.increment_night_count(&token, &date)
            })
            .await
            .map_err(join_error)??;

            match new_count {
                Some(n) => Ok(Json(EndResponse {
                    ok: true,
                    ended: true,
                    self_end_count: Some(n),
                })),
                // The increment lost the cap race. The room stays ended;
                // only the count is refused.
                None => Err(ApiError::LimitReached),
            }
        }
    }
}

/// The poll both clients run against their room. Non-null `ended_at` here
/// is ground truth no matter what the broadcast channel delivered.
pub async fn room_status(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let rid = room_id.to_string();
    let room = tokio::task::spawn_blocking(move || db.get_room(&rid))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::RoomNotFound)?;

    let ended_by_side = room
        .ended_by_side
        .as_deref()
        .and_then(|s| Side::from_str(s).ok());

    Ok(Json(RoomStatusResponse {
        ended_at: room.ended_at,
        ended_by_side,
    }))
}
