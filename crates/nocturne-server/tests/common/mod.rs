#![allow(dead_code)]

//! Shared plumbing for the integration suites: a real server on an
//! ephemeral port with a hand-crankable clock.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use nocturne_api::AppStateInner;
use nocturne_client::{ApiClient, ClientError};
use nocturne_db::Database;
use nocturne_gateway::Dispatcher;
use nocturne_server::build_router;
use nocturne_types::{ManualClock, RoomEvent, Schedule};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct TestServer {
    pub addr: SocketAddr,
    pub clock: Arc<ManualClock>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn with the clock reading 21:30 local, mid-window.
    pub async fn spawn() -> Self {
        Self::spawn_at(local(21, 30, 0)).await
    }

    pub async fn spawn_at(now: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let db = Arc::new(Database::open_in_memory().expect("in-memory database"));
        let state = Arc::new(AppStateInner {
            db,
            dispatcher: Dispatcher::new(),
            schedule: schedule(),
            clock: clock.clone(),
            force_open: false,
        });
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            addr,
            clock,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.url())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The zone every test server runs in: UTC+8.
pub fn schedule() -> Schedule {
    Schedule::from_offset_hours(8).expect("+8 is a valid offset")
}

/// A UTC instant whose +08:00 wall clock reads h:m:s on 2026-03-14.
pub fn local(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    schedule()
        .offset()
        .with_ymd_and_hms(2026, 3, 14, h, m, s)
        .unwrap()
        .with_timezone(&Utc)
}

/// Wait briefly for the next relayed event, with a named failure.
pub async fn recv_within(rx: &mut mpsc::UnboundedReceiver<RoomEvent>, what: &str) -> RoomEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
        .unwrap_or_else(|| panic!("stream closed waiting for {}", what))
}

/// Assert that nothing arrives on the stream for a beat.
pub async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<RoomEvent>) {
    let outcome = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(outcome.is_err(), "expected no event, got {:?}", outcome);
}

/// Expect a structured API refusal with the given status and code.
pub fn assert_refused<T: std::fmt::Debug>(
    result: Result<T, ClientError>,
    status: u16,
    code: &str,
) {
    match result {
        Err(ClientError::Api {
            status: got_status,
            code: got_code,
            ..
        }) => {
            assert_eq!((got_status, got_code.as_str()), (status, code));
        }
        other => panic!("expected {} {}, got {:?}", status, code, other),
    }
}

/// Join a man-seeking-women and a woman-seeking-men entry and match them.
/// Returns the room id.
pub async fn make_room(server: &TestServer, token_a: &str, token_b: &str) -> Uuid {
    use nocturne_types::{Identity, Preference};

    let client = server.client();
    let a = client
        .join(token_a, Identity::Man, Preference::Women)
        .await
        .expect("join a");
    client
        .join(token_b, Identity::Woman, Preference::Men)
        .await
        .expect("join b");
    client
        .attempt_match(a.entry_id)
        .await
        .expect("match a")
        .room_id
        .expect("a and b are compatible")
}
