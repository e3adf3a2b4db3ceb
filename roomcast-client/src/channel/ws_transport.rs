use crate::channel::transport::{BroadcastTransport, ChannelEvent, ChannelLink, Outbound};
use crate::error::ChannelError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use roomcast_core::{PresenceEntry, RelayMessage, Topic};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Broadcast transport backed by a `roomcast-relay` server. Each open topic
/// is its own WebSocket, so losing the socket voids exactly that channel.
#[derive(Debug, Clone)]
pub struct WsTransport {
    base_url: String,
}

impl WsTransport {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:9000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn topic_url(&self, topic: &Topic) -> String {
        format!("{}/topic/{}", self.base_url.trim_end_matches('/'), topic)
    }
}

#[async_trait]
impl BroadcastTransport for WsTransport {
    async fn open(&self, topic: &Topic, member: PresenceEntry) -> Result<ChannelLink, ChannelError> {
        let url = self.topic_url(topic);
        let connect_err = |reason: String| ChannelError::Connect {
            topic: topic.clone(),
            reason,
        };

        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let track = serde_json::to_string(&RelayMessage::Track { entry: member })?;
        sink.send(Message::Text(track.into()))
            .await
            .map_err(|e| connect_err(e.to_string()))?;
        info!("Connected to relay topic {}", url);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();

        tokio::spawn(async move {
            while let Some(Outbound::Publish { event, payload }) = outbound_rx.recv().await {
                let msg = RelayMessage::Publish { event, payload };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize relay message: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let topic = topic.clone();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay socket for {} failed: {}", topic, e);
                        break;
                    }
                };

                let event = match serde_json::from_str::<RelayMessage>(text.as_str()) {
                    Ok(RelayMessage::Frame(frame)) => ChannelEvent::Frame(frame),
                    Ok(RelayMessage::Presence(presence)) => ChannelEvent::Presence(presence),
                    Ok(other) => {
                        debug!("Ignoring client-bound op from relay: {:?}", other);
                        continue;
                    }
                    Err(e) => {
                        warn!("Invalid relay message on {}: {}", topic, e);
                        continue;
                    }
                };

                if events_tx.send(event).is_err() {
                    break;
                }
            }

            let _ = events_tx.send(ChannelEvent::Disconnected);
            debug!("Relay reader for {} finished", topic);
        });

        Ok(ChannelLink {
            outbound: outbound_tx,
            inbound: events_rx,
        })
    }
}
