//! HlsProcessPlayer against a mock media server

use lsplayer::{HlsProcessPlayer, MediaPlayer, PlayerErrorKind, PlayerEvent};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAYLIST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:2\n\
#EXT-X-MEDIA-SEQUENCE:12\n#EXTINF:2.000,\nindex12.ts\n#EXTINF:2.000,\nindex13.ts\n\
#EXTINF:2.000,\nindex14.ts\n";

async fn media_server(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/live/index.m3u8"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "application/vnd.apple.mpegurl")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

fn manifest_url(server: &MockServer) -> String {
    format!("{}/live/live/index.m3u8", server.uri())
}

async fn next_event(rx: &mut UnboundedReceiver<PlayerEvent>) -> Option<PlayerEvent> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no player event")
}

#[tokio::test]
async fn test_manifest_parsed_and_monitor_only_play() {
    let server = media_server(200, PLAYLIST).await;
    let mut player = HlsProcessPlayer::new("", vec![]);
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    assert!(player.has_source());
    assert_eq!(
        next_event(&mut events).await,
        Some(PlayerEvent::ManifestParsed {
            variants: 0,
            segments: 3
        })
    );

    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));

    player.destroy().await;
    assert!(!player.has_source());
    // destroy closes the subscription
    assert_eq!(next_event(&mut events).await, None);
}

#[tokio::test]
async fn test_server_error_is_fatal_network() {
    let server = media_server(503, "").await;
    let mut player = HlsProcessPlayer::new("", vec![]);
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    match next_event(&mut events).await {
        Some(PlayerEvent::Error {
            kind: PlayerErrorKind::Network,
            fatal: true,
            details,
        }) => assert!(details.contains("503")),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_not_a_playlist_is_fatal_media() {
    let server = media_server(200, "<html>not found</html>").await;
    let mut player = HlsProcessPlayer::new("", vec![]);
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(PlayerEvent::Error {
            kind: PlayerErrorKind::Media,
            fatal: true,
            ..
        })
    ));
}

#[tokio::test]
async fn test_start_load_fetches_again() {
    let server = media_server(200, PLAYLIST).await;
    let mut player =
        HlsProcessPlayer::new("", vec![]).recovery_delay(Duration::from_millis(20));
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(PlayerEvent::ManifestParsed { .. })
    ));

    player.start_load().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(PlayerEvent::ManifestParsed { .. })
    ));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_missing_viewer_is_fatal_other() {
    let server = media_server(200, PLAYLIST).await;
    let mut player = HlsProcessPlayer::new("/nonexistent/livestream-viewer", vec![]);
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    next_event(&mut events).await;

    player.play().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        Some(PlayerEvent::Error {
            kind: PlayerErrorKind::Other,
            fatal: true,
            ..
        })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_viewer_exit_status() {
    let server = media_server(200, PLAYLIST).await;

    // clean exit ends playback
    let mut player = HlsProcessPlayer::new("true", vec![]);
    let mut events = player.subscribe();
    player.load(&manifest_url(&server)).await.unwrap();
    next_event(&mut events).await;
    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Ended));

    // a failing viewer is unrecoverable
    let mut player = HlsProcessPlayer::new("false", vec![]);
    let mut events = player.subscribe();
    player.load(&manifest_url(&server)).await.unwrap();
    next_event(&mut events).await;
    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));
    assert!(matches!(
        next_event(&mut events).await,
        Some(PlayerEvent::Error {
            kind: PlayerErrorKind::Other,
            fatal: true,
            ..
        })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_play_after_viewer_exit_starts_a_new_viewer() {
    let server = media_server(200, PLAYLIST).await;
    let mut player = HlsProcessPlayer::new("true", vec![]);
    let mut events = player.subscribe();
    player.load(&manifest_url(&server)).await.unwrap();
    next_event(&mut events).await;

    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Ended));

    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Ended));
}

#[cfg(unix)]
#[tokio::test]
async fn test_destroy_kills_viewer() {
    let server = media_server(200, PLAYLIST).await;
    let mut player = HlsProcessPlayer::new("sh", vec!["-c".to_string(), "sleep 30".to_string()]);
    let mut events = player.subscribe();

    player.load(&manifest_url(&server)).await.unwrap();
    next_event(&mut events).await;
    player.play().await.unwrap();
    assert_eq!(next_event(&mut events).await, Some(PlayerEvent::Playing));

    tokio::time::timeout(Duration::from_secs(5), player.destroy())
        .await
        .expect("destroy hangs");
    assert_eq!(next_event(&mut events).await, None);
}
