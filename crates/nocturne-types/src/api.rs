//! Request and response bodies for the HTTP surface.
//!
//! Identity and preference arrive as raw strings here and are parsed in the
//! handlers, so a bad value yields a domain error body instead of a 422
//! from the JSON layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Side;
use crate::schedule::Phase;

/// Stable machine-readable error codes carried in [`ErrorBody`].
pub mod codes {
    pub const ADMISSION_DENIED: &str = "admission_denied";
    pub const MATCHING_DENIED: &str = "matching_denied";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const NOT_A_PARTICIPANT: &str = "not_a_participant";
    pub const LIMIT_REACHED: &str = "limit_reached";
    pub const ROOM_NOT_FOUND: &str = "room_not_found";
    pub const INTERNAL: &str = "internal";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub token: String,
    pub identity: String,
    pub preference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub entry_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub entry_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub entry_id: Uuid,
}

/// `room_id` is null while the caller is still waiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub room_id: Option<Uuid>,
}

/// Who is asking for the room to end. `User` spends one of the caller's
/// nightly self-ends; `System` is the hard-close path and bypasses the
/// limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndTrigger {
    #[default]
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndRequest {
    pub room_id: Uuid,
    pub token: String,
    #[serde(default)]
    pub trigger: EndTrigger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndResponse {
    pub ok: bool,
    /// True when the room is ended after this call, whether or not this
    /// call did the ending.
    pub ended: bool,
    /// Caller's self-end count after the call. Absent for system ends and
    /// for already-ended rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_end_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitResponse {
    pub self_end_count: i64,
    pub remaining: i64,
    pub night_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub phase: Phase,
    pub local_time: String,
}

/// Poll target for clients watching whether their room was ended remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStatusResponse {
    pub ended_at: Option<String>,
    pub ended_by_side: Option<Side>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
