use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;

#[tokio::test]
async fn a_subscriber_with_no_filter_receives_every_service() {
    let cancel = CancellationToken::new();
    let hub = Hub::spawn(cancel.clone());
    let (_id, handle) = hub.register(Vec::new()).await.unwrap();

    hub.broadcast("web", "hello");
    hub.broadcast("db", "world");

    let first = handle.recv().await.unwrap();
    let second = handle.recv().await.unwrap();
    assert_eq!(first.service, "web");
    assert_eq!(second.service, "db");
    cancel.cancel();
}

#[tokio::test]
async fn a_filtered_subscriber_only_receives_matching_services() {
    let cancel = CancellationToken::new();
    let hub = Hub::spawn(cancel.clone());
    let (_id, handle) = hub.register(vec!["web".to_string()]).await.unwrap();

    hub.broadcast("web", "hello");
    hub.broadcast("db", "ignored");
    hub.broadcast("web", "again");

    let first = handle.recv().await.unwrap();
    let second = handle.recv().await.unwrap();
    assert_eq!(first.message, "hello");
    assert_eq!(second.message, "again");
    cancel.cancel();
}

#[tokio::test]
async fn cancelling_the_hub_closes_every_outbox() {
    let cancel = CancellationToken::new();
    let hub = Hub::spawn(cancel.clone());
    let (_id, handle) = hub.register(Vec::new()).await.unwrap();

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), handle.recv()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn unregistering_closes_just_that_subscriber() {
    let cancel = CancellationToken::new();
    let hub = Hub::spawn(cancel.clone());
    let (id, handle) = hub.register(Vec::new()).await.unwrap();

    hub.unregister(id);
    let result = tokio::time::timeout(Duration::from_secs(1), handle.recv()).await.unwrap();
    assert!(result.is_none());
    cancel.cancel();
}

#[tokio::test]
async fn an_overflowing_outbox_drops_the_oldest_frame() {
    let cancel = CancellationToken::new();
    let hub = Hub::spawn(cancel.clone());
    let (_id, handle) = hub.register(Vec::new()).await.unwrap();

    for i in 0..(DEFAULT_OUTBOX_CAPACITY + 10) {
        hub.broadcast("web", &i.to_string());
    }
    // Give the dispatch loop a moment to drain the intake channel.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let first = handle.recv().await.unwrap();
    assert_eq!(first.message, "10");
    assert!(handle.dropped_count() >= 10);
    cancel.cancel();
}
