pub mod api;
pub mod clock;
pub mod events;
pub mod models;
pub mod schedule;

// Re-export key types for convenience.
pub use clock::{Clock, ManualClock, SystemClock, fmt_ts};
pub use events::RoomEvent;
pub use models::{
    Identity, Preference, SELF_END_CAP, Side, is_valid_token, mutually_compatible,
};
pub use schedule::{Phase, Schedule};
