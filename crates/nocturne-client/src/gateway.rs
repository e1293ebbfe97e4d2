//! Socket plumbing for a live room.
//!
//! The connection is split into a writer task owning the sink and a reader
//! task that parses frames into [`RoomEvent`]s. The returned [`RoomSocket`]
//! is a cloneable handle over the writer, so the chat screen and the close
//! watcher can both push events without sharing a lock.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nocturne_types::{Clock, RoomEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ClientError;

/// Connect to a room's relay socket. `base_ws_url` is the server root with a
/// `ws` scheme, e.g. `ws://127.0.0.1:4320`.
pub async fn connect_room(
    base_ws_url: &str,
    room_id: Uuid,
    token: &str,
    clock: Arc<dyn Clock>,
) -> Result<(RoomSocket, mpsc::UnboundedReceiver<RoomEvent>), ClientError> {
    let url = format!(
        "{}/api/rooms/{}/socket?token={}",
        base_ws_url, room_id, token
    );
    let (stream, _response) = connect_async(&url).await?;
    let (mut sink, mut source) = stream.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
        debug!("room:{} socket writer finished", room_id);
    });

    let (event_tx, event_rx) = mpsc::unbounded_channel::<RoomEvent>();
    tokio::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<RoomEvent>(&text) {
                    Ok(event) => {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("room:{} dropping bad frame: {}", room_id, e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("room:{} socket read error: {}", room_id, e);
                    break;
                }
            }
        }
        debug!("room:{} socket reader finished", room_id);
    });

    let socket = RoomSocket {
        token: token.to_string(),
        clock,
        out: out_tx,
    };
    Ok((socket, event_rx))
}

/// Cloneable send handle for one room connection. Dropping every clone
/// closes the socket.
#[derive(Clone)]
pub struct RoomSocket {
    token: String,
    clock: Arc<dyn Clock>,
    out: mpsc::UnboundedSender<Message>,
}

impl RoomSocket {
    /// Sends a chat line, stamping a fresh id. The id comes back so the
    /// caller can record the line locally before any echo.
    pub fn send_message(&self, text: &str) -> Result<Uuid, ClientError> {
        let id = Uuid::new_v4();
        self.send(&RoomEvent::Message {
            id,
            sender_token: self.token.clone(),
            text: text.to_string(),
            ts: self.clock.now_utc().timestamp_millis(),
        })?;
        Ok(id)
    }

    pub fn send_typing(&self, typing: bool) -> Result<(), ClientError> {
        self.send(&RoomEvent::Typing {
            sender_token: self.token.clone(),
            typing,
        })
    }

    /// Best-effort end notice for the counterpart. The HTTP end call is the
    /// authoritative one.
    pub fn send_end(&self) -> Result<(), ClientError> {
        self.send(&RoomEvent::End {
            sender_token: self.token.clone(),
        })
    }

    fn send(&self, event: &RoomEvent) -> Result<(), ClientError> {
        let json =
            serde_json::to_string(event).map_err(|e| ClientError::Protocol(e.to_string()))?;
        self.out
            .send(Message::Text(json.into()))
            .map_err(|_| ClientError::Protocol("socket already closed".to_string()))
    }
}
