use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nocturne_db::Database;
use nocturne_types::{Clock, RoomEvent, fmt_ts};

use crate::dispatcher::Dispatcher;

/// Handle one participant's socket for one room. Membership was already
/// validated at the upgrade layer, so this is pure relay wiring: broadcast
/// events flow out to the client (minus its own echoes), client frames flow
/// into the room channel.
pub async fn handle_room_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    room_id: Uuid,
    token: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("Participant connected to room:{}", room_id);

    let mut broadcast_rx = dispatcher.join(room_id).await;

    // Forward room events to this client. The publisher's own events are
    // filtered here so each side only ever sees the counterpart.
    let own_token = token.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match broadcast_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("room:{} receiver lagged by {} events", room_id, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if event.sender_token() == own_token {
                continue;
            }

            let text = serde_json::to_string(&event).unwrap();
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Publish frames from this client into the room channel.
    let dispatcher_recv = dispatcher.clone();
    let recv_token = token;
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<RoomEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("room:{} bad frame: {}", room_id, e);
                            continue;
                        }
                    };

                    // A connection may only speak as the token it opened with.
                    if event.sender_token() != recv_token {
                        warn!("room:{} frame sender mismatch, dropped", room_id);
                        continue;
                    }

                    if matches!(event, RoomEvent::Message { .. }) {
                        // Bookkeeping only; the relay never waits on the DB.
                        let db = db.clone();
                        let now = fmt_ts(clock.now_utc());
                        let rid = room_id.to_string();
                        tokio::task::spawn_blocking(move || {
                            if let Err(e) = db.touch_room_message(&rid, &now) {
                                debug!("room:{} message bookkeeping failed: {}", rid, e);
                            }
                        });
                    }

                    dispatcher_recv.publish(room_id, event).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Both tasks must be fully stopped before leave() counts receivers.
    let _ = send_task.await;
    let _ = recv_task.await;

    dispatcher.leave(room_id).await;
    info!("Participant disconnected from room:{}", room_id);
}
