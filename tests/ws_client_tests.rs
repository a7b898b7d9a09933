// Connection manager tests
//
// A mock connector lets each test play the backend: it observes dialing
// attempts, receives the client's frames, and pushes frames or closures at
// the client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use stylist_live::ws::{
    ConnectionState, LiveEvent, MockConnector, MockSocketHandle, OutboundFrame, WsClient,
};

struct Harness {
    client: WsClient,
    busy: Arc<AtomicBool>,
    events: mpsc::Receiver<LiveEvent>,
    accepted: mpsc::UnboundedReceiver<MockSocketHandle>,
    connector: Arc<MockConnector>,
}

fn harness(delay_ms: u64, fail_first: usize) -> Harness {
    let (connector, accepted) = MockConnector::new();
    let connector = Arc::new(connector.fail_first(fail_first));
    let busy = Arc::new(AtomicBool::new(false));
    let (events_tx, events) = mpsc::channel(64);
    let client = WsClient::new(
        "ws://test/ws/live".to_string(),
        Duration::from_millis(delay_ms),
        connector.clone(),
        Arc::clone(&busy),
        events_tx,
    );
    Harness {
        client,
        busy,
        events,
        accepted,
        connector,
    }
}

async fn next_event(events: &mut mpsc::Receiver<LiveEvent>) -> LiveEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_conn(accepted: &mut mpsc::UnboundedReceiver<MockSocketHandle>) -> MockSocketHandle {
    timeout(Duration::from_secs(2), accepted.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("connector dropped")
}

async fn next_client_frame(handle: &mut MockSocketHandle) -> serde_json::Value {
    let raw = timeout(Duration::from_secs(2), handle.from_client.recv())
        .await
        .expect("timed out waiting for client frame")
        .expect("client closed");
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_connect_emits_connected_and_clears_busy() {
    let mut h = harness(50, 0);
    h.busy.store(true, Ordering::SeqCst);

    h.client.connect().await;
    next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));
    assert!(!h.busy.load(Ordering::SeqCst));
    assert!(h.client.is_connected());
    assert_eq!(h.client.state().await, ConnectionState::Open);
}

#[tokio::test]
async fn test_send_serializes_text_frame() {
    let mut h = harness(50, 0);
    h.client.connect().await;
    let mut server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    h.client
        .send(OutboundFrame::Text("red dress".to_string()))
        .await;
    let frame = next_client_frame(&mut server).await;
    assert_eq!(
        frame,
        json!({"type": "text", "data": "red dress", "format": "text"})
    );
}

#[tokio::test]
async fn test_send_while_disconnected_is_dropped() {
    let mut h = harness(50, 0);

    // No connection yet: the frame is dropped, not queued
    h.client
        .send(OutboundFrame::Text("lost forever".to_string()))
        .await;
    assert_eq!(h.connector.attempts(), 0);

    h.client.connect().await;
    let mut server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    // Nothing buffered from before the connection existed
    h.client.send(OutboundFrame::Text("hello".to_string())).await;
    let frame = next_client_frame(&mut server).await;
    assert_eq!(frame["data"], "hello");
    assert!(server.from_client.try_recv().is_err());
}

#[tokio::test]
async fn test_inbound_response_clears_busy_and_dispatches() {
    let mut h = harness(50, 0);
    h.client.connect().await;
    let server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    h.busy.store(true, Ordering::SeqCst);
    server
        .to_client
        .send(r#"{"type":"response","text":"Try the floral dress!"}"#.to_string())
        .unwrap();

    match next_event(&mut h.events).await {
        LiveEvent::Response { text, audio, error } => {
            assert_eq!(text.as_deref(), Some("Try the floral dress!"));
            assert!(audio.is_none());
            assert!(error.is_none());
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!h.busy.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_inbound_audio_is_base64_decoded() {
    let mut h = harness(50, 0);
    h.client.connect().await;
    let server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    let payload = base64::engine::general_purpose::STANDARD.encode([9u8, 8, 7]);
    server
        .to_client
        .send(json!({"type": "response", "audio": payload}).to_string())
        .unwrap();

    match next_event(&mut h.events).await {
        LiveEvent::Response { audio, .. } => assert_eq!(audio, Some(vec![9, 8, 7])),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let mut h = harness(50, 0);
    h.client.connect().await;
    let server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    server.to_client.send("{{{ not json".to_string()).unwrap();
    server
        .to_client
        .send(r#"{"type":"response","text":"still here"}"#.to_string())
        .unwrap();

    // The malformed frame produced no event; the next one did
    match next_event(&mut h.events).await {
        LiveEvent::Response { text, .. } => assert_eq!(text.as_deref(), Some("still here")),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_backend_error_frame_surfaces() {
    let mut h = harness(50, 0);
    h.client.connect().await;
    let server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    server
        .to_client
        .send(r#"{"type":"error","message":"bad audio"}"#.to_string())
        .unwrap();
    match next_event(&mut h.events).await {
        LiveEvent::BackendError { message } => assert_eq!(message, "bad audio"),
        other => panic!("unexpected event: {:?}", other),
    }
    // The session stays usable
    assert!(h.client.is_connected());
}

#[tokio::test]
async fn test_server_close_schedules_one_reconnect() {
    let mut h = harness(30, 0);
    h.client.connect().await;
    let server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    h.busy.store(true, Ordering::SeqCst);
    drop(server); // server-side close
    assert!(matches!(
        next_event(&mut h.events).await,
        LiveEvent::Disconnected { .. }
    ));
    assert!(!h.busy.load(Ordering::SeqCst));

    // A racing manual connect must not produce a second connection
    h.client.connect().await;

    let _server = next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));
    assert_eq!(h.connector.attempts(), 2);

    // Only the one reconnect happened
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(h.connector.attempts(), 2);
    assert!(h.accepted.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_dials_retry_indefinitely() {
    let mut h = harness(20, 2);
    h.client.connect().await;

    // Two refused attempts, each surfaced as a disconnect
    assert!(matches!(
        next_event(&mut h.events).await,
        LiveEvent::Disconnected { .. }
    ));
    assert!(matches!(
        next_event(&mut h.events).await,
        LiveEvent::Disconnected { .. }
    ));

    next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));
    assert_eq!(h.connector.attempts(), 3);
}

#[tokio::test]
async fn test_close_stops_reconnecting() {
    let mut h = harness(20, 0);
    h.client.connect().await;
    next_conn(&mut h.accepted).await;
    assert!(matches!(next_event(&mut h.events).await, LiveEvent::Connected));

    h.client.close().await;
    assert_eq!(h.client.state().await, ConnectionState::Closed);
    assert!(!h.client.is_connected());

    let attempts = h.connector.attempts();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.connector.attempts(), attempts, "no reconnect after teardown");
    assert!(h.accepted.try_recv().is_err());

    // connect() after teardown stays a no-op
    h.client.connect().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.connector.attempts(), attempts);
}
