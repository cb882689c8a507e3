//! Notification Flow Integration Tests
//!
//! Exercises the full path from a server-pushed frame to subscriber
//! delivery, including malformed input and throttled batching.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use common::{TestServer, notification_frame, test_config, wait_until};
use notify_client::{DeliveryMode, NotificationEvent, NotificationService};

fn collector() -> (Arc<Mutex<Vec<NotificationEvent>>>, impl Fn(NotificationEvent)) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event: NotificationEvent| sink.lock().push(event))
}

#[tokio::test]
async fn frame_is_decoded_and_delivered() {
    let mut server = TestServer::start().await;
    let service = NotificationService::new(test_config(server.base_url())).unwrap();

    let (seen, collect) = collector();
    let _sub = service.subscribe_notifications(collect);

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    session.send_text(notification_frame("u1", "d1", "2023-01-01T00:00:00Z"));
    assert!(wait_until(Duration::from_secs(2), || !seen.lock().is_empty()).await);

    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "u1-d1-2023-01-01T00:00:00Z");
    assert_eq!(events[0].actor.id, "u1");
    assert_eq!(events[0].actor.name, "User u1");
    assert_eq!(events[0].subject.id, "d1");
    assert_eq!(events[0].subject.title, "Document d1");
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let mut server = TestServer::start().await;
    let service = NotificationService::new(test_config(server.base_url())).unwrap();

    let (seen, collect) = collector();
    let _sub = service.subscribe_notifications(collect);

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    session.send_text("not json at all");
    session.send_text(r#"{"unexpected": true}"#);
    session.send_text(notification_frame("u2", "d2", "2023-06-15T12:30:00Z"));

    assert!(wait_until(Duration::from_secs(2), || !seen.lock().is_empty()).await);
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(seen.lock()[0].id, "u2-d2-2023-06-15T12:30:00Z");

    // The connection survives undecodable input.
    assert!(service.is_connected());
}

#[tokio::test]
async fn throttled_mode_batches_a_burst() {
    let mut server = TestServer::start().await;
    let mut config = test_config(server.base_url());
    config.dispatch.mode = DeliveryMode::Throttled;
    config.dispatch.throttle_window = Duration::from_millis(300);
    let service = NotificationService::new(config).unwrap();

    let (seen, collect) = collector();
    let _sub = service.subscribe_notifications(collect);

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    session.send_text(notification_frame("u1", "d1", "2023-01-01T00:00:00Z"));
    session.send_text(notification_frame("u1", "d2", "2023-01-01T00:00:01Z"));
    session.send_text(notification_frame("u1", "d3", "2023-01-01T00:00:02Z"));

    // Events buffer until the window elapses.
    assert!(
        wait_until(Duration::from_secs(2), || {
            service.dispatcher().pending_count() == 3
        })
        .await
    );
    assert!(seen.lock().is_empty());

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 3).await);
    let ids: Vec<String> = seen.lock().iter().map(|e| e.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            "u1-d1-2023-01-01T00:00:00Z",
            "u1-d2-2023-01-01T00:00:01Z",
            "u1-d3-2023-01-01T00:00:02Z",
        ]
    );
}

#[tokio::test]
async fn disconnect_discards_buffered_events() {
    let mut server = TestServer::start().await;
    let mut config = test_config(server.base_url());
    config.dispatch.mode = DeliveryMode::Throttled;
    config.dispatch.throttle_window = Duration::from_secs(30);
    let service = NotificationService::new(config).unwrap();

    let (seen, collect) = collector();
    let _sub = service.subscribe_notifications(collect);

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    session.send_text(notification_frame("u1", "d1", "2023-01-01T00:00:00Z"));
    assert!(
        wait_until(Duration::from_secs(2), || {
            service.dispatcher().pending_count() == 1
        })
        .await
    );

    service.disconnect();
    assert_eq!(service.dispatcher().pending_count(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn outbound_payload_reaches_server() {
    let mut server = TestServer::start().await;
    let service = NotificationService::new(test_config(server.base_url())).unwrap();

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    service.send(serde_json::json!({"type": "ack", "id": "u1-d1-2023-01-01T00:00:00Z"}));

    assert!(wait_until(Duration::from_secs(2), || !session.received().is_empty()).await);
    let frames = session.received();
    let parsed: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(parsed["type"], "ack");
}

#[tokio::test]
async fn send_while_disconnected_is_a_noop() {
    let server = TestServer::start().await;
    let service = NotificationService::new(test_config(server.base_url())).unwrap();

    service.send(serde_json::json!({"type": "ack"}));
    assert!(!service.is_connected());
}

#[tokio::test]
async fn cancelled_subscription_stops_receiving() {
    let mut server = TestServer::start().await;
    let service = NotificationService::new(test_config(server.base_url())).unwrap();

    let (first_seen, first) = collector();
    let (second_seen, second) = collector();
    let first_sub = service.subscribe_notifications(first);
    let _second_sub = service.subscribe_notifications(second);

    service.connect();
    let session = server.next_session().await;
    assert!(wait_until(Duration::from_secs(2), || service.is_connected()).await);

    first_sub.cancel();
    session.send_text(notification_frame("u1", "d1", "2023-01-01T00:00:00Z"));

    assert!(wait_until(Duration::from_secs(2), || !second_seen.lock().is_empty()).await);
    assert!(first_seen.lock().is_empty());
}
