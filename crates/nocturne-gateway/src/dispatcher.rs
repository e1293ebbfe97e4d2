use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

use nocturne_types::RoomEvent;

/// Events buffered per room channel before slow receivers start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Manages one broadcast channel per live room.
///
/// Channels exist only while someone is connected; events published to a
/// room with no listeners are dropped. That is fine: delivery here is
/// best-effort and the room row is the authority.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// room_id -> broadcast sender. Created on first join, removed when the
    /// last receiver disconnects.
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<RoomEvent>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to a room's channel, creating the channel on first join.
    /// Create and subscribe happen under one write lock so a concurrent
    /// `leave` cannot reap the channel in between.
    pub async fn join(&self, room_id: Uuid) -> broadcast::Receiver<RoomEvent> {
        let mut rooms = self.inner.rooms.write().await;
        rooms
            .entry(room_id)
            .or_insert_with(|| {
                debug!("Opening channel room:{}", room_id);
                broadcast::channel(CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    /// Publish an event to a room. A room nobody listens to swallows the
    /// event silently.
    pub async fn publish(&self, room_id: Uuid, event: RoomEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(tx) = rooms.get(&room_id) {
            let _ = tx.send(event);
        }
    }

    /// Reap the room's channel once its last receiver is gone. Connections
    /// call this after dropping their receiver.
    pub async fn leave(&self, room_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        let orphaned = rooms
            .get(&room_id)
            .is_some_and(|tx| tx.receiver_count() == 0);
        if orphaned {
            rooms.remove(&room_id);
            debug!("Closing channel room:{}", room_id);
        }
    }

    /// Number of rooms with an open channel right now.
    pub async fn open_channels(&self) -> usize {
        self.inner.rooms.read().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
