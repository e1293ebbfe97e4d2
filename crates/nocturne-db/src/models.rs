//! Database row types, mapped one to one onto SQLite rows. Kept distinct
//! from the nocturne-types wire models so the storage layer stays aligned
//! with the schema; handlers parse these into domain enums.

pub struct QueueEntryRow {
    pub id: String,
    pub token: String,
    pub identity: String,
    pub preference: String,
    pub active: bool,
    pub joined_at: String,
    pub last_seen: String,
}

pub struct RoomRow {
    pub id: String,
    pub entry_a: String,
    pub entry_b: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub ended_by_token: Option<String>,
    pub ended_by_side: Option<String>,
    pub last_message_at: Option<String>,
    pub message_count: i64,
}

/// A room joined with the tokens of its two entries, for participant and
/// side checks without a second round trip.
pub struct RoomMembership {
    pub room: RoomRow,
    pub token_a: String,
    pub token_b: String,
}
