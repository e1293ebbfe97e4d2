//! Room termination and the nightly self-end allowance.

mod common;

use chrono::Duration;
use common::{TestServer, assert_refused, local, make_room};
use nocturne_client::ClientError;
use nocturne_types::api::{EndTrigger, codes};
use nocturne_types::{SELF_END_CAP, Side};
use uuid::Uuid;

const ALPHA: &str = "alpha-secret-token";
const BRAVO: &str = "bravo-secret-token";

#[tokio::test]
async fn a_user_end_closes_the_room_and_spends_one_self_end() {
    let server = TestServer::spawn().await;
    let client = server.client();
    let room = make_room(&server, ALPHA, BRAVO).await;

    let response = client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    assert!(response.ok);
    assert!(response.ended);
    assert_eq!(response.self_end_count, Some(1));

    // The poll is how the counterpart finds out.
    let status = client.room_status(room).await.unwrap();
    assert!(status.ended_at.is_some());
    assert_eq!(status.ended_by_side, Some(Side::A));

    let limit = client.limit(ALPHA).await.unwrap();
    assert_eq!(limit.self_end_count, 1);
    assert_eq!(limit.remaining, SELF_END_CAP - 1);
}

#[tokio::test]
async fn ending_twice_succeeds_without_rewriting_anything() {
    let server = TestServer::spawn().await;
    let client = server.client();
    let room = make_room(&server, ALPHA, BRAVO).await;

    client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    let first = client.room_status(room).await.unwrap();

    // The second end arrives later on the clock; the record must not move.
    server.clock.advance(Duration::minutes(3));
    let response = client.end_room(room, BRAVO, EndTrigger::User).await.unwrap();
    assert!(response.ended);
    assert_eq!(response.self_end_count, None);

    let second = client.room_status(room).await.unwrap();
    assert_eq!(second.ended_at, first.ended_at);
    assert_eq!(second.ended_by_side, Some(Side::A));

    // The no-op end cost bravo nothing.
    assert_eq!(client.limit(BRAVO).await.unwrap().self_end_count, 0);
}

#[tokio::test]
async fn a_stranger_cannot_end_a_room() {
    let server = TestServer::spawn().await;
    let client = server.client();
    let room = make_room(&server, ALPHA, BRAVO).await;

    assert_refused(
        client.end_room(room, "charlie-ng-token", EndTrigger::User).await,
        403,
        codes::NOT_A_PARTICIPANT,
    );
    assert!(client.room_status(room).await.unwrap().ended_at.is_none());
}

#[tokio::test]
async fn ending_a_missing_room_is_not_found() {
    let server = TestServer::spawn().await;
    assert_refused(
        server
            .client()
            .end_room(Uuid::new_v4(), ALPHA, EndTrigger::User)
            .await,
        404,
        codes::ROOM_NOT_FOUND,
    );
}

#[tokio::test]
async fn the_limit_endpoint_counts_down_per_night() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let fresh = client.limit(ALPHA).await.unwrap();
    assert_eq!(fresh.self_end_count, 0);
    assert_eq!(fresh.remaining, SELF_END_CAP);
    assert_eq!(fresh.night_date.to_string(), "2026-03-14");

    let first = make_room(&server, ALPHA, "bravo-one-token").await;
    client.end_room(first, ALPHA, EndTrigger::User).await.unwrap();
    assert_eq!(client.limit(ALPHA).await.unwrap().remaining, SELF_END_CAP - 1);

    let second = make_room(&server, ALPHA, "bravo-two-token").await;
    client.end_room(second, ALPHA, EndTrigger::User).await.unwrap();
    let spent = client.limit(ALPHA).await.unwrap();
    assert_eq!(spent.self_end_count, SELF_END_CAP);
    assert_eq!(spent.remaining, 0);
}

#[tokio::test]
async fn the_third_self_end_is_refused_and_the_room_survives() {
    let server = TestServer::spawn().await;
    let client = server.client();

    for counterpart in ["bravo-one-token", "bravo-two-token"] {
        let room = make_room(&server, ALPHA, counterpart).await;
        client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    }

    let third = make_room(&server, ALPHA, BRAVO).await;
    assert_refused(
        client.end_room(third, ALPHA, EndTrigger::User).await,
        429,
        codes::LIMIT_REACHED,
    );

    // The conversation is still live and the counterpart can still end it
    // on their own allowance.
    assert!(client.room_status(third).await.unwrap().ended_at.is_none());
    let response = client.end_room(third, BRAVO, EndTrigger::User).await.unwrap();
    assert_eq!(response.self_end_count, Some(1));
    assert_eq!(
        client.room_status(third).await.unwrap().ended_by_side,
        Some(Side::B)
    );
}

#[tokio::test]
async fn system_ends_bypass_the_allowance() {
    let server = TestServer::spawn().await;
    let client = server.client();

    for counterpart in ["bravo-one-token", "bravo-two-token"] {
        let room = make_room(&server, ALPHA, counterpart).await;
        client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    }
    let room = make_room(&server, ALPHA, BRAVO).await;

    // Capped out, yet the hard-close path still works.
    let response = client.end_room(room, ALPHA, EndTrigger::System).await.unwrap();
    assert!(response.ended);
    assert_eq!(response.self_end_count, None);

    let status = client.room_status(room).await.unwrap();
    assert!(status.ended_at.is_some());
    // Nobody gets the blame for a clock-driven end.
    assert_eq!(status.ended_by_side, None);
    assert_eq!(client.limit(ALPHA).await.unwrap().self_end_count, SELF_END_CAP);
}

#[tokio::test]
async fn simultaneous_system_ends_are_both_fine() {
    let server = TestServer::spawn().await;
    let client = server.client();
    let room = make_room(&server, ALPHA, BRAVO).await;

    let (from_a, from_b) = tokio::join!(
        client.end_room(room, ALPHA, EndTrigger::System),
        client.end_room(room, BRAVO, EndTrigger::System),
    );
    assert!(from_a.unwrap().ended);
    assert!(from_b.unwrap().ended);
    assert!(client.room_status(room).await.unwrap().ended_at.is_some());
}

#[tokio::test]
async fn concurrent_self_ends_never_exceed_the_cap() {
    let server = TestServer::spawn().await;
    let client = server.client();

    let rooms = [
        make_room(&server, ALPHA, "bravo-one-token").await,
        make_room(&server, ALPHA, "bravo-two-token").await,
        make_room(&server, ALPHA, "bravo-three-tok").await,
    ];

    let results = tokio::join!(
        client.end_room(rooms[0], ALPHA, EndTrigger::User),
        client.end_room(rooms[1], ALPHA, EndTrigger::User),
        client.end_room(rooms[2], ALPHA, EndTrigger::User),
    );
    let results = [results.0, results.1, results.2];

    let counted = results
        .iter()
        .filter(|r| matches!(r, Ok(resp) if resp.self_end_count.is_some()))
        .count();
    let refused = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(ClientError::Api { code, .. }) if code == codes::LIMIT_REACHED
            )
        })
        .count();
    assert_eq!(counted, SELF_END_CAP as usize);
    assert_eq!(refused, 1);

    // However the three interleaved, the allowance is exactly spent and at
    // least the two counted rooms are closed.
    let limit = client.limit(ALPHA).await.unwrap();
    assert_eq!(limit.self_end_count, SELF_END_CAP);
    assert_eq!(limit.remaining, 0);

    let mut ended = 0;
    for room in rooms {
        if client.room_status(room).await.unwrap().ended_at.is_some() {
            ended += 1;
        }
    }
    assert!(ended >= SELF_END_CAP as usize);
}

#[tokio::test]
async fn a_new_night_resets_the_allowance() {
    let server = TestServer::spawn().await;
    let client = server.client();

    for counterpart in ["bravo-one-token", "bravo-two-token"] {
        let room = make_room(&server, ALPHA, counterpart).await;
        client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    }
    assert_eq!(client.limit(ALPHA).await.unwrap().remaining, 0);

    // Tomorrow, 21:30 local.
    server.clock.set(local(21, 30, 0) + Duration::days(1));

    let tomorrow = client.limit(ALPHA).await.unwrap();
    assert_eq!(tomorrow.self_end_count, 0);
    assert_eq!(tomorrow.remaining, SELF_END_CAP);
    assert_eq!(tomorrow.night_date.to_string(), "2026-03-15");

    let room = make_room(&server, ALPHA, BRAVO).await;
    let response = client.end_room(room, ALPHA, EndTrigger::User).await.unwrap();
    assert_eq!(response.self_end_count, Some(1));
}
