//! Window phase, as the server sees it. Clients poll this but every
//! state-changing call re-derives the phase itself; this endpoint is for
//! display and for clients sanity-checking their local clock.

use axum::{Json, extract::State};

use nocturne_types::api::StatusResponse;

use crate::state::AppState;

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let now = state.clock.now_utc();
    Json(StatusResponse {
        phase: state.schedule.phase(now),
        local_time: state.schedule.local_time_string(now),
    })
}
