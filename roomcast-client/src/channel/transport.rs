use crate::error::ChannelError;
use async_trait::async_trait;
use roomcast_core::{Frame, PresenceEntry, PresenceEvent, Topic};
use tokio::sync::mpsc;

/// Requests from a channel handle to its transport.
#[derive(Debug)]
pub enum Outbound {
    Publish {
        event: String,
        payload: serde_json::Value,
    },
}

/// Everything a transport can deliver on an open topic.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Frame(Frame),
    Presence(PresenceEvent),
    /// The underlying connection is gone. Nothing follows.
    Disconnected,
}

/// A live membership in one topic.
///
/// Dropping `outbound` leaves the topic; the transport then ends `inbound`.
pub struct ChannelLink {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// The network substrate beneath a broadcast channel: named topics,
/// at-least-once fan-out including the publisher itself, and membership
/// tracking (sync snapshots plus join/leave notices).
#[async_trait]
pub trait BroadcastTransport: Send + Sync + 'static {
    async fn open(&self, topic: &Topic, member: PresenceEntry) -> Result<ChannelLink, ChannelError>;
}
