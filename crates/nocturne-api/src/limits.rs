//! Nightly self-end allowance.

use axum::{Json, extract::State, response::IntoResponse};

use nocturne_types::SELF_END_CAP;
use nocturne_types::api::{LimitRequest, LimitResponse};
use nocturne_types::models::is_valid_token;

use crate::error::{ApiError, join_error};
use crate::state::AppState;

pub async fn limit(
    State(state): State<AppState>,
    Json(req): Json<LimitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_token(&req.token) {
        return Err(ApiError::InvalidInput(
            "token must be 10-128 printable ASCII characters".into(),
        ));
    }

    let night_date = state.schedule.night_date(state.clock.now_utc());
    let date = night_date.to_string();
    let db = state.db.clone();
    let token = req.token.clone();
    let count = tokio::task::spawn_blocking(move || db.night_count(&token, &date))
        .await
        .map_err(join_error)??;

    Ok(Json(LimitResponse {
        self_end_count: count,
        remaining: (SELF_END_CAP - count).max(0),
        night_date,
    }))
}
