//! Client-side building blocks for the nightly chat protocol: a typed HTTP
//! client, the room socket plumbing, the pure session state machine, and
//! the background polling loops that tie them together.

pub mod api;
pub mod gateway;
pub mod session;
pub mod tasks;

pub use api::{ApiClient, ClientError};
pub use gateway::{RoomSocket, connect_room};
pub use session::{EndReason, RoomSession, SessionState};
pub use tasks::MatchWait;
