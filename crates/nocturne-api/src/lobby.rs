//! Queue entry and matchmaking handlers.

use std::str::FromStr;

use anyhow::anyhow;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info, warn};
use uuid::Uuid;

use nocturne_db::Database;
use nocturne_types::api::{
    JoinRequest, JoinResponse, LeaveRequest, LeaveResponse, MatchRequest, MatchResponse,
};
use nocturne_types::fmt_ts;
use nocturne_types::models::{Identity, Preference, is_valid_token, mutually_compatible};
use nocturne_types::schedule::Phase;

use crate::error::{ApiError, join_error};
use crate::state::AppState;

pub async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = Identity::from_str(&req.identity).map_err(|_| {
        ApiError::InvalidInput("identity must be man, woman or unspecified".into())
    })?;
    let preference = Preference::from_str(&req.preference)
        .map_err(|_| ApiError::InvalidInput("preference must be men, women or any".into()))?;
    if !is_valid_token(&req.token) {
        return Err(ApiError::InvalidInput(
            "token must be 10-128 printable ASCII characters".into(),
        ));
    }

    let now = state.clock.now_utc();
    if state.schedule.phase(now) != Phase::Open && !state.force_open {
        return Err(ApiError::AdmissionDenied(
            "the nightly window is not open for new entries".into(),
        ));
    }

    let entry_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.db.clone();
    let id = entry_id.to_string();
    let token = req.token.clone();
    let ts = fmt_ts(now);
    tokio::task::spawn_blocking(move || {
        db.insert_queue_entry(&id, &token, identity.as_str(), preference.as_str(), &ts)
    })
    .await
    .map_err(join_error)??;

    info!(
        "Entry {} joined the queue as {} seeking {}",
        entry_id, identity, preference
    );

    Ok((StatusCode::CREATED, Json(JoinResponse { entry_id })))
}

pub async fn leave(
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let id = req.entry_id.to_string();
    tokio::task::spawn_blocking(move || db.deactivate_entry(&id))
        .await
        .map_err(join_error)??;

    Ok(Json(LeaveResponse { ok: true }))
}

pub async fn attempt_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry_id = req.entry_id.to_string();

    // A caller who was paired before the cutoff must still get its room id
    // back afterward, so retrieval runs before any phase gate.
    let db = state.db.clone();
    let id = entry_id.clone();
    let existing = tokio::task::spawn_blocking(move || db.find_room_for_entry(&id))
        .await
        .map_err(join_error)??;
    if let Some(room) = existing {
        return Ok(Json(MatchResponse {
            room_id: Some(parse_room_id(&room.id)?),
        }));
    }

    let now = state.clock.now_utc();
    let phase = state.schedule.phase(now);
    if matches!(phase, Phase::MatchingClosed | Phase::Closed) && !state.force_open {
        return Err(ApiError::MatchingDenied(
            "no new rooms are created this late in the window".into(),
        ));
    }

    let db = state.db.clone();
    let id = entry_id.clone();
    let ts = fmt_ts(now);
    let outcome = tokio::task::spawn_blocking(move || run_matcher(&db, &id, &ts))
        .await
        .map_err(join_error)??;

    match outcome {
        MatchOutcome::Matched(room_id) => Ok(Json(MatchResponse {
            room_id: Some(room_id),
        })),
        MatchOutcome::Waiting => Ok(Json(MatchResponse { room_id: None })),
        MatchOutcome::UnknownEntry => Err(ApiError::InvalidInput("unknown queue entry".into())),
    }
}

enum MatchOutcome {
    Matched(Uuid),
    Waiting,
    UnknownEntry,
}

/// FIFO scan over the active queue with an atomic claim per candidate.
///
/// Losing a claim race is normal: the candidate (or the caller itself) was
/// grabbed by another matcher between the scan and the claim. The loop just
/// moves on, and the final room lookup settles what actually happened.
fn run_matcher(db: &Database, entry_id: &str, now: &str) -> anyhow::Result<MatchOutcome> {
    let Some(caller) = db.get_entry(entry_id)? else {
        return Ok(MatchOutcome::UnknownEntry);
    };

    if caller.active {
        db.touch_last_seen(entry_id, now)?;

        let caller_identity = Identity::from_str(&caller.identity)
            .map_err(|_| anyhow!("corrupt identity on entry {}", caller.id))?;
        let caller_preference = Preference::from_str(&caller.preference)
            .map_err(|_| anyhow!("corrupt preference on entry {}", caller.id))?;

        for candidate in db.active_candidates_fifo()? {
            if candidate.id == caller.id || candidate.token == caller.token {
                continue;
            }

            let (Ok(identity), Ok(preference)) = (
                Identity::from_str(&candidate.identity),
                Preference::from_str(&candidate.preference),
            ) else {
                warn!("Skipping corrupt queue entry {}", candidate.id);
                continue;
            };

            if !mutually_compatible(caller_identity, caller_preference, identity, preference) {
                continue;
            }

            let room_id = Uuid::new_v4();
            if db.claim_pair_and_create_room(
                &room_id.to_string(),
                &caller.id,
                &candidate.id,
                now,
            )? {
                info!(
                    "Matched entries {} and {} into room:{}",
                    caller.id, candidate.id, room_id
                );
                return Ok(MatchOutcome::Matched(room_id));
            }
        }
    }

    // Whether the scan came up empty or the caller was claimed mid-scan by
    // the counterpart's matcher, the room table has the answer.
    if let Some(room) = db.find_room_for_entry(entry_id)? {
        return Ok(MatchOutcome::Matched(Uuid::parse_str(&room.id)?));
    }

    Ok(MatchOutcome::Waiting)
}

fn parse_room_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| {
        error!("Corrupt room id '{}': {}", raw, e);
        ApiError::Internal
    })
}
