use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use nocturne_types::RoomEvent;
use nocturne_types::api::RoomStatusResponse;
use uuid::Uuid;

/// How long a counterpart's typing indicator stays lit without a refresh.
const TYPING_LINGER_MS: i64 = 1500;

/// Who brought the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    You,
    Counterpart,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    WaitingForMatch,
    Live,
    Ended(EndReason),
}

/// One transcript line, ours or theirs.
#[derive(Debug, Clone)]
pub struct ChatLine {
    pub id: Uuid,
    pub mine: bool,
    pub text: String,
    pub ts: i64,
}

/// Pure state machine behind a room screen.
///
/// The socket is a latency optimization, so everything here is written to
/// survive duplicate, echoed and out-of-order events: lines are deduplicated
/// by id, our own echoes are dropped, and `Ended` is terminal with the first
/// recorded reason winning. Poll results feed in through [`apply_poll`] and
/// act as ground truth.
///
/// [`apply_poll`]: RoomSession::apply_poll
pub struct RoomSession {
    token: String,
    state: SessionState,
    transcript: Vec<ChatLine>,
    seen_ids: HashSet<Uuid>,
    typing_until: Option<DateTime<Utc>>,
}

impl RoomSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            state: SessionState::WaitingForMatch,
            transcript: Vec::new(),
            seen_ids: HashSet::new(),
            typing_until: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn counterpart_typing(&self, now: DateTime<Utc>) -> bool {
        self.typing_until.is_some_and(|until| until > now)
    }

    /// Marks the session live once the matcher hands back a room.
    pub fn matched(&mut self) {
        if self.state == SessionState::WaitingForMatch {
            self.state = SessionState::Live;
        }
    }

    /// Records a line we just sent, so the transcript shows it immediately
    /// and a relayed echo of it can never duplicate it.
    pub fn push_local(&mut self, id: Uuid, text: impl Into<String>, ts: i64) {
        if self.state != SessionState::Live {
            return;
        }
        if self.seen_ids.insert(id) {
            self.transcript.push(ChatLine {
                id,
                mine: true,
                text: text.into(),
                ts,
            });
        }
    }

    /// Folds one relayed event into the session. Events are ignored outside
    /// the `Live` state.
    pub fn apply_event(&mut self, event: RoomEvent, now: DateTime<Utc>) {
        if self.state != SessionState::Live {
            return;
        }
        match event {
            RoomEvent::Message {
                id,
                sender_token,
                text,
                ts,
            } => {
                if sender_token == self.token {
                    return;
                }
                if self.seen_ids.insert(id) {
                    self.transcript.push(ChatLine {
                        id,
                        mine: false,
                        text,
                        ts,
                    });
                }
            }
            RoomEvent::Typing {
                sender_token,
                typing,
            } => {
                if sender_token == self.token {
                    return;
                }
                self.typing_until = if typing {
                    Some(now + Duration::milliseconds(TYPING_LINGER_MS))
                } else {
                    None
                };
            }
            RoomEvent::End { sender_token } => {
                let reason = if sender_token == self.token {
                    EndReason::You
                } else {
                    EndReason::Counterpart
                };
                self.finish(reason);
            }
        }
    }

    /// Folds an authoritative poll result in. A closed room always wins over
    /// a live one, but never rewrites a reason we already know.
    pub fn apply_poll(&mut self, status: &RoomStatusResponse) {
        if status.ended_at.is_some() {
            self.finish(EndReason::System);
        }
    }

    /// Ends the session from our own side, ahead of any round trip.
    pub fn end_locally(&mut self, reason: EndReason) {
        self.finish(reason);
    }

    /// Housekeeping called from the UI loop. Clears a typing indicator whose
    /// linger window has passed.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.typing_until.is_some_and(|until| until <= now) {
            self.typing_until = None;
        }
    }

    fn finish(&mut self, reason: EndReason) {
        if !matches!(self.state, SessionState::Ended(_)) {
            self.state = SessionState::Ended(reason);
            self.typing_until = None;
        }
    }
}
