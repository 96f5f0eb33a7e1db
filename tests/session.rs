//! Synthesis session state machine scenarios
//!
//! Each test runs the full protocol against a scripted loopback
//! WebSocket server: the server sends `first` after the handshake,
//! reads client messages until the finish directive, then replays
//! `events` and closes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use vox_cli::Error;
use vox_cli::audio::OpusCodec;
use vox_cli::cache::AudioCache;
use vox_cli::synthesis::{SynthesisRequest, SynthesisSession};

fn request() -> SynthesisRequest {
    SynthesisRequest::new("m1", "Cherry", "hello")
}

fn delta_event(pcm: &[u8]) -> serde_json::Value {
    json!({"type": "response.audio.delta", "delta": BASE64.encode(pcm)})
}

/// Spawn a scripted server; returns its ws:// URL
async fn mock_server(first: serde_json::Value, events: Vec<serde_json::Value>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        if ws.send(Message::text(first.to_string())).await.is_err() {
            return;
        }

        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg
                && text.contains("session.finish")
            {
                break;
            }
        }

        for event in events {
            if ws.send(Message::text(event.to_string())).await.is_err() {
                return;
            }
        }
        let _ = ws.close(None).await;
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn three_deltas_then_finished_delivers_in_order() {
    let frames = [vec![1u8, 2, 3, 4], vec![5, 6], vec![7, 8, 9, 10]];
    let endpoint = mock_server(
        json!({"type": "session.created"}),
        vec![
            delta_event(&frames[0]),
            delta_event(&frames[1]),
            delta_event(&frames[2]),
            json!({"type": "response.done"}),
            json!({"type": "session.finished"}),
        ],
    )
    .await;

    let mut received: Vec<Vec<u8>> = Vec::new();
    let session = SynthesisSession::new("test-key").with_endpoint(endpoint);
    session
        .run(&request(), |pcm| received.push(pcm.to_vec()))
        .await
        .unwrap();

    assert_eq!(received, frames);
}

#[tokio::test]
async fn wrong_first_event_is_protocol_violation_with_zero_frames() {
    let endpoint = mock_server(delta_event(&[1, 2]), vec![]).await;

    let mut frames = 0;
    let session = SynthesisSession::new("test-key").with_endpoint(endpoint);
    let err = session
        .run(&request(), |_| frames += 1)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    assert_eq!(frames, 0);
}

#[tokio::test]
async fn error_event_surfaces_server_error_after_delivered_frames() {
    let raw_error = json!({"type": "error", "code": "Throttled", "message": "slow down"});
    let endpoint = mock_server(
        json!({"type": "session.created"}),
        vec![delta_event(&[1, 2, 3, 4]), raw_error.clone()],
    )
    .await;

    let mut frames = 0;
    let session = SynthesisSession::new("test-key").with_endpoint(endpoint);
    let err = session
        .run(&request(), |_| frames += 1)
        .await
        .unwrap_err();

    // One frame was already delivered and stays delivered
    assert_eq!(frames, 1);
    match err {
        Error::Server(raw) => assert_eq!(
            serde_json::from_str::<serde_json::Value>(&raw).unwrap(),
            raw_error
        ),
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn eof_after_response_done_is_transport_error() {
    // A server that closes after response.done without session.finished
    // must not look like success
    let endpoint = mock_server(
        json!({"type": "session.created"}),
        vec![delta_event(&[1, 2]), json!({"type": "response.done"})],
    )
    .await;

    let session = SynthesisSession::new("test-key").with_endpoint(endpoint);
    let err = session.run(&request(), |_| {}).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn unrecognized_events_are_skipped() {
    let endpoint = mock_server(
        json!({"type": "session.created"}),
        vec![
            json!({"type": "response.metadata.delta", "delta": "x"}),
            delta_event(&[9, 9]),
            json!({"type": "session.finished"}),
        ],
    )
    .await;

    let mut received = Vec::new();
    let session = SynthesisSession::new("test-key").with_endpoint(endpoint);
    session
        .run(&request(), |pcm| received.extend_from_slice(pcm))
        .await
        .unwrap();

    assert_eq!(received, vec![9, 9]);
}

#[tokio::test]
async fn connect_failure_is_transport_error() {
    // Nothing listens on port 1
    let session = SynthesisSession::new("test-key").with_endpoint("ws://127.0.0.1:1");
    let err = session.run(&request(), |_| {}).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn cache_hit_never_opens_a_transport() {
    let dir = TempDir::new().unwrap();
    let cache = AudioCache::with_codec(dir.path().to_path_buf(), OpusCodec::unavailable());
    let pcm = vec![1u8, 2, 3, 4, 5, 6];
    cache.store(&request().fingerprint(), &pcm).await;

    // An unconnectable endpoint proves no dial is attempted on a hit
    let mut received = Vec::new();
    let session = SynthesisSession::new("test-key")
        .with_endpoint("ws://127.0.0.1:1")
        .with_cache(&cache);
    session
        .run(&request(), |frame| received.extend_from_slice(frame))
        .await
        .unwrap();

    assert_eq!(received, pcm);
}

#[tokio::test]
async fn successful_stream_is_written_back_to_the_cache() {
    let frames = [vec![1u8, 2, 3, 4], vec![5, 6, 7, 8]];
    let endpoint = mock_server(
        json!({"type": "session.created"}),
        vec![
            delta_event(&frames[0]),
            delta_event(&frames[1]),
            json!({"type": "session.finished"}),
        ],
    )
    .await;

    let dir = TempDir::new().unwrap();
    let cache = AudioCache::with_codec(dir.path().to_path_buf(), OpusCodec::unavailable());

    let session = SynthesisSession::new("test-key")
        .with_endpoint(endpoint)
        .with_cache(&cache);
    session.run(&request(), |_| {}).await.unwrap();

    let cached = cache.lookup(&request().fingerprint()).await.unwrap();
    assert_eq!(cached, [frames[0].as_slice(), frames[1].as_slice()].concat());
}
