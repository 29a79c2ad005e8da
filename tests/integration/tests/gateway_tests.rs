//! Gateway liveness integration tests
//!
//! Each test plays the remote gateway against a router over an in-memory
//! socket, with tokio's clock paused so heartbeat timing is exact.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::*;
use pulse_common::HeartbeatMode;
use pulse_gateway::{HeartbeatError, OpCode, RouteOutcome, RouterError};
use tokio::time::Instant;

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fresh_session_heartbeats_and_identifies() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    let outcome = conn.router.handle_frame(&hello_frame(41_250)).await.unwrap();
    assert_eq!(outcome, RouteOutcome::Handshake { resumed: false });
    assert!((conn.manager().current_interval() - 41.25).abs() < f64::EPSILON);

    let heartbeat = conn.expect(OpCode::Heartbeat).await.unwrap();
    assert_eq!(heartbeat.as_heartbeat_seq(), Some(None));

    let identify = conn.expect(OpCode::Identify).await.unwrap();
    let d = identify.d.unwrap();
    assert_eq!(d["token"], "test-token");
    assert_eq!(d["intents"], 513);
    assert_eq!(d["properties"]["device"], "pulse-tests");

    assert!(conn.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_resumes_with_last_sequence() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut first = TestConnection::open(&config);

    first.router.handle_frame(&hello_frame(45_000)).await.unwrap();
    first.router.handle_frame(&ready_frame(1, "session-1")).await.unwrap();
    first.router.handle_frame(&event_frame(5, "MESSAGE_CREATE")).await.unwrap();
    assert!(first.router.on_close(Some(1006)));

    let manager = first.manager();
    drop(first);

    let mut second = TestConnection::reopen(manager, &config);
    let outcome = second.router.handle_frame(&hello_frame(45_000)).await.unwrap();
    assert_eq!(outcome, RouteOutcome::Handshake { resumed: true });

    let resume = second.expect(OpCode::Resume).await.unwrap();
    assert_eq!(resume.s, Some(5));
    let payload = resume.as_resume().unwrap();
    assert_eq!(payload.seq, 5);
    assert_eq!(payload.session_id.as_deref(), Some("session-1"));
    assert_eq!(payload.token.as_deref(), Some("test-token"));

    // A resume replaces both the first heartbeat and the identify
    assert!(second.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_forces_fresh_identify() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut first = TestConnection::open(&config);

    first.router.handle_frame(&hello_frame(45_000)).await.unwrap();
    first.router.handle_frame(&ready_frame(3, "session-1")).await.unwrap();

    let outcome = first
        .router
        .handle_frame(&invalid_session_frame(false))
        .await
        .unwrap();
    assert_eq!(outcome, RouteOutcome::Reconnect { resume: false });

    let mut second = TestConnection::reopen(first.manager(), &config);
    second.router.handle_frame(&hello_frame(45_000)).await.unwrap();

    let ops: Vec<OpCode> = vec![
        second.recv().await.unwrap().op,
        second.recv().await.unwrap().op,
    ];
    assert_eq!(ops, vec![OpCode::Heartbeat, OpCode::Identify]);
}

#[tokio::test(start_paused = true)]
async fn test_gateway_reconnect_request_keeps_session() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(45_000)).await.unwrap();
    conn.router.handle_frame(&event_frame(9, "TYPING_START")).await.unwrap();

    let outcome = conn.router.handle_frame(&reconnect_frame()).await.unwrap();
    assert_eq!(outcome, RouteOutcome::Reconnect { resume: true });
    assert_eq!(conn.manager().last_sequence(), Some(9));
}

#[tokio::test(start_paused = true)]
async fn test_close_codes_decide_reconnect_and_resume() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let conn = TestConnection::open(&config);
    conn.manager().update_sequence(4);

    // Invalid sequence: reconnect, but with a fresh session
    assert!(conn.router.on_close(Some(4007)));
    assert_eq!(conn.manager().last_sequence(), None);

    // Authentication failed: give up
    assert!(!conn.router.on_close(Some(4004)));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_hello_is_fatal() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    let err = conn
        .router
        .handle_frame(r#"{"op":10,"d":{"heartbeat_interval":0}}"#)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RouterError::Heartbeat(HeartbeatError::ProtocolViolation(_))
    ));
    assert!(err.is_fatal());
    assert!(conn.manager().current_interval().abs() < f64::EPSILON);
    assert!(conn.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_hello_interval_is_fatal() {
    let config = test_config(HeartbeatMode::Triggered).unwrap();
    let mut conn = TestConnection::open(&config);

    let err = conn
        .router
        .handle_frame(r#"{"op":10,"d":{"heartbeat_interval":1e30}}"#)
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(conn.manager().interval().is_none());

    // An ACK cannot schedule a heartbeat on a session that never started
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();
    let failure = conn.router.next_failure().await.unwrap();
    assert!(matches!(failure, HeartbeatError::NotStarted));
    assert!(conn.pending().is_empty());
}

// ============================================================================
// Heartbeat Timing Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_heartbeats_every_interval_with_latest_sequence() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    let start = Instant::now();
    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.expect(OpCode::Heartbeat).await.unwrap();
    conn.expect(OpCode::Identify).await.unwrap();
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();

    conn.router.handle_frame(&event_frame(2, "GUILD_CREATE")).await.unwrap();
    let beat = conn.expect(OpCode::Heartbeat).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    assert_eq!(beat.as_heartbeat_seq(), Some(Some(2)));
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();

    conn.router.handle_frame(&event_frame(3, "GUILD_CREATE")).await.unwrap();
    let beat = conn.expect(OpCode::Heartbeat).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    assert_eq!(beat.as_heartbeat_seq(), Some(Some(3)));

    let latency = conn.manager().snapshot().latency_ms;
    assert_eq!(latency, Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_fixed_rate_keeps_wall_clock_schedule() {
    let config = test_config(HeartbeatMode::FixedRate).unwrap();
    let mut conn = TestConnection::open(&config);

    let start = Instant::now();
    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.expect(OpCode::Heartbeat).await.unwrap();
    conn.expect(OpCode::Identify).await.unwrap();

    // ACKs arrive late, but before the next tick
    for tick in 1..=3u64 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();

        conn.expect(OpCode::Heartbeat).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(tick * 1_000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_triggered_mode_heartbeats_one_interval_after_each_ack() {
    let config = test_config(HeartbeatMode::Triggered).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.expect(OpCode::Heartbeat).await.unwrap();
    conn.expect(OpCode::Identify).await.unwrap();

    // Without an ACK nothing is scheduled
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(conn.pending().is_empty());

    tokio::time::sleep(Duration::from_millis(250)).await;
    let acked_at = Instant::now();
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();

    conn.expect(OpCode::Heartbeat).await.unwrap();
    assert_eq!(acked_at.elapsed(), Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_server_heartbeat_request_is_answered_immediately() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(45_000)).await.unwrap();
    conn.pending();
    conn.router.handle_frame(&event_frame(6, "PRESENCE_UPDATE")).await.unwrap();

    let start = Instant::now();
    let outcome = conn.router.handle_frame(&heartbeat_request_frame()).await.unwrap();
    assert_eq!(outcome, RouteOutcome::HeartbeatRequested);

    let beat = conn.expect(OpCode::Heartbeat).await.unwrap();
    assert_eq!(beat.as_heartbeat_seq(), Some(Some(6)));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_heartbeat_reports_zombied() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.pending();

    let failure = conn.router.next_failure().await.unwrap();
    assert!(matches!(failure, HeartbeatError::Zombied { interval_ms: 1_000 }));
    assert!(failure.allows_resume());

    // The zombied timer did not send a second heartbeat
    assert!(conn.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_closed_socket_reports_transport_failure() {
    let config = test_config(HeartbeatMode::FixedRate).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();
    conn.close_outbound();

    let failure = conn.router.next_failure().await.unwrap();
    assert!(matches!(failure, HeartbeatError::Transport(_)));
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_timer() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let mut conn = TestConnection::open(&config);

    conn.router.handle_frame(&hello_frame(1_000)).await.unwrap();
    conn.router.handle_frame(&heartbeat_ack_frame()).await.unwrap();
    conn.pending();

    assert!(conn.router.on_close(None));
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(conn.pending().is_empty());
}

#[tokio::test]
async fn test_decode_error_on_garbage_frame() {
    let config = test_config(HeartbeatMode::Drift).unwrap();
    let conn = TestConnection::open(&config);

    let err = conn.router.handle_frame("{\"op\":").await.unwrap_err();
    assert!(matches!(err, RouterError::Decode(_)));
}
