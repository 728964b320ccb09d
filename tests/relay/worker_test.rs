//! Relay worker: sequential, in-order delivery from the handler queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use channel_relay::relay::worker::{drain_worker, spawn_worker};
use channel_relay::relay::Relay;

use crate::support::{message, MockPlatform, MockWebhook, Sent, RULE};

#[tokio::test]
async fn worker_relays_in_queue_order_and_stops_when_senders_drop() {
    let relay: Arc<Relay<MockWebhook>> = Arc::new(Relay::new(RULE, "Message Forwarder", true));
    let platform = Arc::new(MockPlatform::new());
    let (tx, rx) = mpsc::channel(8);

    let handle = spawn_worker(Arc::clone(&relay), Arc::clone(&platform), rx);

    for text in ["one", "two", "three"] {
        tx.send(message(text, Vec::new()))
            .await
            .expect("worker should be receiving");
    }
    drop(tx);
    handle.await.expect("worker should exit cleanly");

    let contents: Vec<Option<String>> = platform
        .sent()
        .into_iter()
        .map(|sent| match sent {
            Sent::Webhook { message, .. } | Sent::Plain { message, .. } => message.content,
        })
        .collect();
    assert_eq!(
        contents,
        vec![
            Some("one".to_owned()),
            Some("two".to_owned()),
            Some("three".to_owned())
        ]
    );
    assert_eq!(platform.created(), 1, "webhook resolved once for all messages");
}

#[tokio::test(start_paused = true)]
async fn drain_lets_queued_messages_finish() {
    let relay: Arc<Relay<MockWebhook>> = Arc::new(Relay::new(RULE, "Message Forwarder", true));
    let platform = Arc::new(MockPlatform::new());
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_worker(Arc::clone(&relay), Arc::clone(&platform), rx);

    for text in ["first", "second"] {
        tx.send(message(text, Vec::new()))
            .await
            .expect("worker should be receiving");
    }

    assert!(drain_worker(tx, handle, Duration::from_secs(5)).await);
    assert_eq!(platform.sent().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn drain_aborts_a_stuck_worker_after_grace() {
    let relay: Arc<Relay<MockWebhook>> = Arc::new(Relay::new(RULE, "Message Forwarder", true));
    let platform = Arc::new(MockPlatform {
        create_delay: Some(Duration::from_secs(60)),
        ..MockPlatform::new()
    });
    let (tx, rx) = mpsc::channel(8);
    let handle = spawn_worker(Arc::clone(&relay), Arc::clone(&platform), rx);

    tx.send(message("slow", Vec::new()))
        .await
        .expect("worker should be receiving");

    let start = tokio::time::Instant::now();
    assert!(!drain_worker(tx, handle, Duration::from_secs(5)).await);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert!(platform.sent().is_empty());
}
