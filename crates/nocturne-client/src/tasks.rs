//! Background loops behind the waiting and room screens.

use std::sync::Arc;
use std::time::Duration;

use nocturne_types::api::{EndTrigger, RoomStatusResponse, codes};
use nocturne_types::{Clock, Schedule};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, ClientError};
use crate::gateway::RoomSocket;

/// How often the waiting screen retries the matcher.
const MATCH_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How often a live room re-reads its authoritative status.
const ROOM_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// How often the close watcher consults the clock.
const CLOSE_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchWait {
    /// Paired into this room.
    Matched(Uuid),
    /// The window stopped making new rooms before a counterpart appeared.
    Closed,
    /// The caller gave up waiting.
    Cancelled,
}

/// Polls the matcher until a room appears, the matching cutoff passes, or
/// `cancel` fires. Transport failures are retried on the next tick; any
/// structured refusal other than the cutoff bubbles out.
pub async fn poll_for_match(
    client: &ApiClient,
    entry_id: Uuid,
    cancel: &CancellationToken,
) -> Result<MatchWait, ClientError> {
    loop {
        if cancel.is_cancelled() {
            return Ok(MatchWait::Cancelled);
        }
        match client.attempt_match(entry_id).await {
            Ok(response) => {
                if let Some(room_id) = response.room_id {
                    info!("Matched into room:{}", room_id);
                    return Ok(MatchWait::Matched(room_id));
                }
            }
            Err(ClientError::Api { ref code, .. }) if code == codes::MATCHING_DENIED => {
                return Ok(MatchWait::Closed);
            }
            Err(e @ ClientError::Api { .. }) => return Err(e),
            Err(e) => warn!("Match poll failed, retrying: {}", e),
        }
        tokio::select! {
            _ = cancel.cancelled() => return Ok(MatchWait::Cancelled),
            _ = tokio::time::sleep(MATCH_POLL_INTERVAL) => {}
        }
    }
}

/// Spawns the authoritative status poll behind a live room.
///
/// Every status read is forwarded to the receiver. The task stops after
/// forwarding an ended status, when the receiver is dropped, or when
/// `cancel` fires. Read failures are logged and retried.
pub fn spawn_room_watch(
    client: ApiClient,
    room_id: Uuid,
    cancel: CancellationToken,
) -> mpsc::Receiver<RoomStatusResponse> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(ROOM_POLL_INTERVAL) => {}
            }
            match client.room_status(room_id).await {
                Ok(status) => {
                    let ended = status.ended_at.is_some();
                    if tx.send(status).await.is_err() {
                        break;
                    }
                    if ended {
                        break;
                    }
                }
                Err(e) => debug!("room:{} status poll failed: {}", room_id, e),
            }
        }
        debug!("room:{} watch finished", room_id);
    });
    rx
}

/// Watches the wall clock behind a live room and fires the hard close:
/// one system end over HTTP, then a best-effort end notice over the socket
/// for a counterpart whose own watcher is lagging.
///
/// Resolves `true` once the close has fired, `false` when cancelled first.
/// The caller should mark its session ended by the system as soon as this
/// resolves true; its own poll would reach the same verdict a beat later.
pub async fn run_close_watch(
    client: ApiClient,
    clock: Arc<dyn Clock>,
    schedule: Schedule,
    room_id: Uuid,
    token: String,
    socket: Option<RoomSocket>,
    cancel: CancellationToken,
) -> bool {
    loop {
        if schedule.until_hard_close(clock.now_utc()).is_zero() {
            info!("room:{} hard close reached, firing system end", room_id);
            if let Err(e) = client.end_room(room_id, &token, EndTrigger::System).await {
                warn!("room:{} system end call failed: {}", room_id, e);
            }
            if let Some(socket) = socket {
                let _ = socket.send_end();
            }
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(CLOSE_TICK) => {}
        }
    }
}
