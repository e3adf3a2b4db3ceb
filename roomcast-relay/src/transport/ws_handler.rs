use crate::topic::TopicCommand;
use crate::transport::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use roomcast_core::{PresenceEntry, RelayMessage, Topic};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long a fresh socket may take to say who it is.
const TRACK_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(topic): Path<String>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let topic = Topic::new(topic);

    ws.on_upgrade(move |socket| handle_socket(socket, topic, service))
}

async fn handle_socket(socket: WebSocket, topic: Topic, service: RelayService) {
    let (mut sender, mut receiver) = socket.split();

    let entry = match tokio::time::timeout(TRACK_TIMEOUT, read_track(&mut receiver)).await {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            warn!("Socket on {} closed without tracking", topic);
            let _ = sender.close().await;
            return;
        }
        Err(_) => {
            warn!("Socket on {} never tracked, closing", topic);
            let _ = sender.close().await;
            return;
        }
    };

    let conn = service.next_conn();
    let peer_id = entry.id().clone();
    info!("New relay connection {} for {} on {}", conn, peer_id, topic);

    let (tx, rx) = mpsc::channel(service.config().outbound_buffer.max(1));
    let topic_tx = service.topics.track(&topic, conn, entry, tx).await;

    let mut send_task = tokio::spawn(forward_outbound(sender, rx));

    let mut recv_task = tokio::spawn({
        let topic_tx = topic_tx.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelayMessage>(&text) {
                        Ok(RelayMessage::Publish { event, payload }) => {
                            let cmd = TopicCommand::Publish {
                                conn,
                                event,
                                payload,
                            };
                            if let Err(e) = topic_tx.send(cmd).await {
                                error!("Topic died: {}", e);
                                break;
                            }
                        }
                        Ok(other) => debug!("Ignoring {:?} from {}", other, peer_id),
                        Err(e) => warn!("Invalid RelayMessage from {}: {}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let _ = topic_tx.send(TopicCommand::Untrack { conn }).await;
    info!("Relay connection {} for {} closed", conn, peer_id);
}

/// Waits for the `Track` message every socket must open with.
async fn read_track(receiver: &mut SplitStream<WebSocket>) -> Option<PresenceEntry> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                return match serde_json::from_str::<RelayMessage>(&text) {
                    Ok(RelayMessage::Track { entry }) => Some(entry),
                    Ok(other) => {
                        warn!("Expected Track as first message, got {:?}", other);
                        None
                    }
                    Err(e) => {
                        warn!("Invalid first message: {}", e);
                        None
                    }
                };
            }
            Message::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

async fn forward_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<RelayMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let json = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize relay message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}
