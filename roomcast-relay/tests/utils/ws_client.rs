use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use roomcast_core::{Identity, PresenceEntry, PresenceEvent, RelayMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const RECV_TIMEOUT_MS: u64 = 2000;

/// A raw relay client speaking the wire protocol by hand.
pub struct WsClient {
    pub entry: PresenceEntry,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connects without tracking.
    pub async fn connect_raw(addr: SocketAddr, topic: &str, name: &str) -> Result<Self> {
        let url = format!("ws://{}/topic/{}", addr, topic);
        let (socket, _) = connect_async(url.as_str())
            .await
            .context("Failed to connect to relay")?;
        Ok(Self {
            entry: PresenceEntry::new(Identity::generate(name), 0),
            socket,
        })
    }

    /// Connects, tracks and consumes the initial membership sync.
    pub async fn join(addr: SocketAddr, topic: &str, name: &str, joined_at: u64) -> Result<(Self, Vec<PresenceEntry>)> {
        let mut client = Self::connect_raw(addr, topic, name).await?;
        client.entry.joined_at = joined_at;
        client
            .send(&RelayMessage::Track {
                entry: client.entry.clone(),
            })
            .await?;

        let entries = loop {
            match client.recv().await? {
                RelayMessage::Presence(PresenceEvent::Sync { entries }) => break entries,
                _ => continue,
            }
        };
        Ok((client, entries))
    }

    pub async fn send(&mut self, msg: &RelayMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.socket.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn publish(&mut self, event: &str, payload: serde_json::Value) -> Result<()> {
        self.send(&RelayMessage::Publish {
            event: event.to_owned(),
            payload,
        })
        .await
    }

    pub async fn recv(&mut self) -> Result<RelayMessage> {
        let timeout = Duration::from_millis(RECV_TIMEOUT_MS);
        loop {
            let msg = tokio::time::timeout(timeout, self.socket.next())
                .await
                .context("Timeout waiting for relay message")?;
            match msg {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(text.as_str())?),
                Some(Ok(Message::Close(_))) | None => bail!("Relay closed the socket"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => bail!("Socket error: {}", e),
            }
        }
    }

    /// Skips presence traffic until a frame arrives.
    pub async fn recv_frame(&mut self) -> Result<roomcast_core::Frame> {
        loop {
            if let RelayMessage::Frame(frame) = self.recv().await? {
                return Ok(frame);
            }
        }
    }

    /// Skips everything until `matches` accepts a presence event.
    pub async fn recv_presence<F>(&mut self, matches: F) -> Result<PresenceEvent>
    where
        F: Fn(&PresenceEvent) -> bool,
    {
        loop {
            if let RelayMessage::Presence(event) = self.recv().await? {
                if matches(&event) {
                    return Ok(event);
                }
            }
        }
    }

    /// True once the relay closed the socket.
    pub async fn is_closed_by_relay(&mut self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.socket.next()).await,
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_)))
        )
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}
