use roomcast_core::RelayMessage;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_relay};

#[tokio::test]
async fn test_first_message_must_be_track() {
    init_tracing();

    let (addr, service) = spawn_relay(Duration::from_secs(60)).await;

    let mut client = WsClient::connect_raw(addr, "presence-x", "mallory").await.unwrap();
    client
        .send(&RelayMessage::Publish {
            event: "join".into(),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap();

    assert!(client.is_closed_by_relay().await);
    assert_eq!(service.topic_count(), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    init_tracing();

    let (addr, _service) = spawn_relay(Duration::from_secs(60)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}
