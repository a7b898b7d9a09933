// End-to-end session tests over mock devices and a mock socket
//
// These cover the scenarios a hosting UI drives: talking by voice, typing,
// snapshotting the camera, and the busy/error state the UI renders.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use stylist_live::ws::MockSocketHandle;
use stylist_live::{
    AudioChunk, CameraState, ConnectionState, DeviceCounters, LiveSession, MockCamera,
    MockConnector, MockMicrophone, MockSink, SessionConfig, VideoFrame,
};

struct Harness {
    session: LiveSession,
    accepted: mpsc::UnboundedReceiver<MockSocketHandle>,
    sink: MockSink,
    mic_counters: DeviceCounters,
    cam_counters: DeviceCounters,
}

fn harness(mic: MockMicrophone, camera: MockCamera) -> Harness {
    let (connector, accepted) = MockConnector::new();
    let sink = MockSink::new();
    let mic_counters = mic.counters();
    let cam_counters = camera.counters();
    let config = SessionConfig {
        ws_url: "ws://test/ws/live".to_string(),
        reconnect_delay: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let session = LiveSession::new(
        config,
        Arc::new(connector),
        Box::new(mic),
        Box::new(camera),
        Arc::new(sink.clone()),
    );
    Harness {
        session,
        accepted,
        sink,
        mic_counters,
        cam_counters,
    }
}

async fn started(h: &mut Harness) -> MockSocketHandle {
    h.session.start().await;
    let server = timeout(Duration::from_secs(2), h.accepted.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("connector dropped");
    // The handle arrives while the connection is still being wired up;
    // wait for it to actually open before driving the session.
    wait_until(h, |s| s.connection == ConnectionState::Open).await;
    server
}

async fn next_client_frame(server: &mut MockSocketHandle) -> serde_json::Value {
    let raw = timeout(Duration::from_secs(2), server.from_client.recv())
        .await
        .expect("timed out waiting for client frame")
        .expect("client closed");
    serde_json::from_str(&raw).unwrap()
}

/// Poll the session until `predicate` holds or two seconds pass.
async fn wait_until<F>(h: &Harness, mut predicate: F)
where
    F: FnMut(&stylist_live::SessionSnapshot) -> bool,
{
    for _ in 0..200 {
        let stats = h.session.stats().await;
        if predicate(&stats) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held; last stats: {:?}", h.session.stats().await);
}

fn wav_base64(samples: &[i16]) -> String {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    base64::engine::general_purpose::STANDARD.encode(cursor.into_inner())
}

#[tokio::test]
async fn test_text_round_trip() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let mut server = started(&mut h).await;

    h.session.submit_text("red dress").await;
    let frame = next_client_frame(&mut server).await;
    assert_eq!(
        frame,
        json!({"type": "text", "data": "red dress", "format": "text"})
    );
    assert!(h.session.stats().await.busy);

    server
        .to_client
        .send(r#"{"type":"response","text":"Try the floral dress!"}"#.to_string())
        .unwrap();
    wait_until(&h, |s| {
        s.last_response_text.as_deref() == Some("Try the floral dress!") && !s.busy
    })
    .await;
}

#[tokio::test]
async fn test_blank_text_is_ignored() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let mut server = started(&mut h).await;

    h.session.submit_text("").await;
    h.session.submit_text("   ").await;
    h.session.submit_text("\n\t ").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h.session.stats().await.busy);
    assert!(server.from_client.try_recv().is_err());

    // Leading/trailing whitespace is trimmed off real input
    h.session.submit_text("  hello  ").await;
    let frame = next_client_frame(&mut server).await;
    assert_eq!(frame["data"], "hello");
}

#[tokio::test]
async fn test_voice_round_trip() {
    let mic = MockMicrophone::new().with_chunks(vec![AudioChunk {
        samples: vec![10, 20, 30],
        sample_rate: 16000,
        channels: 1,
    }]);
    let mut h = harness(mic, MockCamera::new());
    let mut server = started(&mut h).await;

    h.session.record_start().await.unwrap();
    assert!(h.session.stats().await.recording);

    h.session.record_stop().await.unwrap();
    let frame = next_client_frame(&mut server).await;
    assert_eq!(frame["type"], "audio");
    assert_eq!(frame["format"], "audio/wav");
    let wav = base64::engine::general_purpose::STANDARD
        .decode(frame["data"].as_str().unwrap())
        .unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![10, 20, 30]);

    let stats = h.session.stats().await;
    assert!(stats.busy);
    assert!(!stats.recording);
    assert_eq!(h.mic_counters.stops(), 1);
}

#[tokio::test]
async fn test_mic_denial_marks_only_the_audio_control() {
    let mic = MockMicrophone::new().with_permission_denied();
    let mut h = harness(mic, MockCamera::new());
    let _server = started(&mut h).await;

    assert!(h.session.record_start().await.is_err());

    let stats = h.session.stats().await;
    assert!(!stats.recording);
    assert!(stats
        .mic_error
        .as_deref()
        .unwrap()
        .contains("Permission denied"));
    assert!(stats.camera_error.is_none());
    assert!(!stats.busy);
}

#[tokio::test]
async fn test_audio_response_replaces_playback() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let server = started(&mut h).await;

    server
        .to_client
        .send(json!({"type": "response", "audio": wav_base64(&[1, 2, 3, 4])}).to_string())
        .unwrap();
    wait_until(&h, |s| s.playing).await;
    assert_eq!(h.sink.plays(), 1);

    // A second response arrives while the first is still sounding: it
    // replaces the playback instead of queueing behind it
    server
        .to_client
        .send(json!({"type": "response", "audio": wav_base64(&[5, 6])}).to_string())
        .unwrap();
    for _ in 0..200 {
        if h.sink.plays() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.sink.plays(), 2);
    assert_eq!(h.sink.last_audio().unwrap().samples, vec![5, 6]);
    assert!(h.sink.is_playing());
}

#[tokio::test]
async fn test_response_text_does_not_wait_for_audio() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let server = started(&mut h).await;

    server
        .to_client
        .send(
            json!({
                "type": "response",
                "text": "A bold choice!",
                "audio": wav_base64(&[7, 7, 7]),
            })
            .to_string(),
        )
        .unwrap();
    wait_until(&h, |s| {
        s.last_response_text.as_deref() == Some("A bold choice!") && s.playing
    })
    .await;
    assert_eq!(h.sink.plays(), 1);
}

#[tokio::test]
async fn test_backend_error_is_rendered_inline() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let server = started(&mut h).await;

    server
        .to_client
        .send(r#"{"type":"error","message":"model overloaded"}"#.to_string())
        .unwrap();
    wait_until(&h, |s| {
        s.last_error.as_deref() == Some("Error: model overloaded")
    })
    .await;

    // The session stays usable
    assert_eq!(h.session.stats().await.connection, ConnectionState::Open);
}

#[tokio::test]
async fn test_snapshot_transmits_image_without_busy() {
    let camera = MockCamera::new().with_frames(vec![VideoFrame {
        jpeg: vec![0xff, 0xd8, 0x01],
    }]);
    let mut h = harness(MockMicrophone::new(), camera);
    let mut server = started(&mut h).await;

    assert_eq!(h.session.camera_toggle().await.unwrap(), CameraState::On);

    // The preview slot fills asynchronously
    let mut sent = false;
    for _ in 0..200 {
        if h.session.send_snapshot().await.is_ok() {
            sent = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(sent, "snapshot never became available");

    let frame = next_client_frame(&mut server).await;
    assert_eq!(frame["type"], "image");
    assert_eq!(frame["format"], "image/jpeg");
    let jpeg = base64::engine::general_purpose::STANDARD
        .decode(frame["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(jpeg, vec![0xff, 0xd8, 0x01]);

    // Snapshots never mark the session busy
    assert!(!h.session.stats().await.busy);
}

#[tokio::test]
async fn test_disconnect_surfaces_then_reconnect_clears() {
    let mut h = harness(MockMicrophone::new(), MockCamera::new());
    let server = started(&mut h).await;

    drop(server);
    wait_until(&h, |s| s.last_error.is_some()).await;

    // The automatic reconnect restores the session and clears the error
    timeout(Duration::from_secs(2), h.accepted.recv())
        .await
        .expect("no reconnect")
        .expect("connector dropped");
    wait_until(&h, |s| {
        s.connection == ConnectionState::Open && s.last_error.is_none()
    })
    .await;
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let mic = MockMicrophone::new().with_chunks(vec![AudioChunk {
        samples: vec![1],
        sample_rate: 16000,
        channels: 1,
    }]);
    let camera = MockCamera::new().with_frames(vec![VideoFrame { jpeg: vec![1] }]);
    let mut h = harness(mic, camera);
    let mut server = started(&mut h).await;

    h.session.record_start().await.unwrap();
    h.session.camera_toggle().await.unwrap();

    h.session.shutdown().await;

    assert_eq!(h.mic_counters.stops(), 1);
    assert_eq!(h.cam_counters.stops(), 1);
    assert_eq!(h.session.stats().await.connection, ConnectionState::Closed);

    // The aborted recording was discarded, not transmitted
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.from_client.try_recv().is_err());

    // And no reconnect follows a deliberate teardown
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(h.accepted.try_recv().is_err());
}
