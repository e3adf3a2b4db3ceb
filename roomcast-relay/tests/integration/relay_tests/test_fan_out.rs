use serde_json::json;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_relay};

#[tokio::test]
async fn test_publish_reaches_everyone_including_sender() {
    init_tracing();

    let (addr, _service) = spawn_relay(Duration::from_secs(60)).await;

    let (mut alice, _) = WsClient::join(addr, "whiteboard-1", "alice", 1).await.unwrap();
    let (mut bob, _) = WsClient::join(addr, "whiteboard-1", "bob", 2).await.unwrap();

    let alice_id = alice.entry.id().clone();
    alice
        .publish("draw-point", json!({ "x": 1, "y": 2 }))
        .await
        .unwrap();

    for client in [&mut alice, &mut bob] {
        let frame = client.recv_frame().await.expect("Frame not delivered");
        assert_eq!(frame.event, "draw-point");
        assert_eq!(frame.payload["x"], 1);
        assert_eq!(frame.sender, alice_id);
    }

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test]
async fn test_sender_is_stamped_by_the_relay() {
    init_tracing();

    let (addr, _service) = spawn_relay(Duration::from_secs(60)).await;

    let (mut alice, _) = WsClient::join(addr, "code-1", "alice", 1).await.unwrap();
    let (mut bob, _) = WsClient::join(addr, "code-1", "bob", 2).await.unwrap();

    bob.publish("file-edit", json!({ "sender": "someone else" }))
        .await
        .unwrap();

    let frame = alice.recv_frame().await.unwrap();
    assert_eq!(frame.sender, *bob.entry.id());

    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test]
async fn test_topics_are_isolated() {
    init_tracing();

    let (addr, service) = spawn_relay(Duration::from_secs(60)).await;

    let (mut board, _) = WsClient::join(addr, "whiteboard-1", "alice", 1).await.unwrap();
    let (mut code, _) = WsClient::join(addr, "code-1", "alice", 1).await.unwrap();
    assert_eq!(service.topic_count(), 2);

    board.publish("clear", json!(null)).await.unwrap();
    board.recv_frame().await.unwrap();

    let leaked = tokio::time::timeout(Duration::from_millis(200), code.recv_frame()).await;
    assert!(leaked.is_err(), "Frame crossed topics");

    board.close().await.unwrap();
    code.close().await.unwrap();
}
