//! Integration tests for lsclient against a mock server

use lsclient::{request_with_retry, Error, LiveState, LiveStreamClient};
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer, timeout: Duration) -> LiveStreamClient {
    LiveStreamClient::builder()
        .api_base(server.uri())
        .timeout(timeout)
        .debug(true)
        .build()
        .await
        .unwrap()
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({ "success": true, "data": data })
}

#[tokio::test]
async fn test_get_status_live() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/status"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "isLive": true,
            "status": "live",
            "viewers": 5
        }))))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;
    let status = client.get_status().await.unwrap();

    assert!(status.is_live);
    assert_eq!(status.status, LiveState::Live);
    assert_eq!(status.viewers, 5);
}

#[tokio::test]
async fn test_get_stream_url_and_stats() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "hlsUrl": "http://localhost:8000/live/live/index.m3u8",
            "streamKey": "live"
        }))))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/stream/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "bitrate": 2500,
            "resolution": "1920x1080",
            "fps": 30,
            "codec": "H.264",
            "viewers": 12,
            "uptime": 3725
        }))))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    let url = client.get_stream_url().await.unwrap();
    assert_eq!(url.hls_url, "http://localhost:8000/live/live/index.m3u8");
    assert_eq!(url.stream_key, "live");

    let stats = client.get_stats().await.unwrap();
    assert_eq!(stats.resolution.as_deref(), Some("1920x1080"));
    assert_eq!(stats.fps, Some(30.0));
    assert_eq!(stats.uptime, Some(3725));
}

#[tokio::test]
async fn test_server_info_and_connection_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "name": "Live Streaming Server",
            "version": "1.0.0",
            "rtmpPort": 1935,
            "httpPort": 8000,
            "apiPort": 3000,
            "streamKey": "live"
        }))))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    let info = client.get_server_info().await.unwrap();
    assert_eq!(info.name, "Live Streaming Server");
    assert_eq!(info.api_port, Some(3000));
    assert!(client.check_connection().await);
}

#[tokio::test]
async fn test_connection_check_swallows_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;
    assert!(!client.check_connection().await);

    // Nothing listens on the discard port
    let unreachable = LiveStreamClient::builder()
        .api_base("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    assert!(!unreachable.check_connection().await);
}

#[tokio::test]
async fn test_http_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    match client.get_stats().await {
        Err(Error::HttpStatus(500)) => {}
        other => panic!("expected HttpStatus(500), got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/url"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "No active stream"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    match client.get_stream_url().await {
        Err(Error::Rejected(reason)) => assert_eq!(reason, "No active stream"),
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({"isLive": true, "status": "live", "viewers": 1})))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    let result = client.get_status().await;
    assert!(matches!(result, Err(Error::Timeout)), "got {:?}", result);
    assert!(started.elapsed() < Duration::from_millis(800));
}

#[tokio::test]
async fn test_commands_are_posted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/stream/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/stream/stop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "message": "Stream stopped"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    let started = assert_ok!(client.start_stream().await);
    assert!(started.success);

    let stopped = assert_ok!(client.stop_stream().await);
    assert!(stopped.success);
    assert_eq!(stopped.message.as_deref(), Some("Stream stopped"));
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "name": "Live Streaming Server",
            "version": "1.0.0"
        }))))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    let info = request_with_retry(|| client.get_server_info(), 3, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(info.version, "1.0.0");
}

#[tokio::test]
async fn test_retry_surfaces_last_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/stream/status"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5)).await;

    let result = request_with_retry(|| client.get_status(), 3, Duration::from_millis(10)).await;
    assert!(matches!(result, Err(Error::HttpStatus(404))));
}
