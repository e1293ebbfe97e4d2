//! Wire events exchanged over a room socket.
//!
//! Every frame is JSON with a `type` tag and a `data` payload. The sender's
//! token travels inside the payload so each end can drop its own echoes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A chat line. `id` is client-generated and used for deduplication;
    /// `ts` is milliseconds since the Unix epoch.
    Message {
        id: Uuid,
        sender_token: String,
        text: String,
        ts: i64,
    },
    /// Typing indicator toggle. Receivers clear it on a timer regardless.
    Typing { sender_token: String, typing: bool },
    /// The sender ended the conversation for both sides.
    End { sender_token: String },
}

impl RoomEvent {
    pub fn sender_token(&self) -> &str {
        match self {
            RoomEvent::Message { sender_token, .. } => sender_token,
            RoomEvent::Typing { sender_token, .. } => sender_token,
            RoomEvent::End { sender_token } => sender_token,
        }
    }
}
