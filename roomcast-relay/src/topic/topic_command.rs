use roomcast_core::{PresenceEntry, RelayMessage};
use tokio::sync::mpsc;

/// Requests from sockets to the actor owning their topic.
#[derive(Debug)]
pub enum TopicCommand {
    /// A socket identified itself and wants the topic's traffic.
    Track {
        conn: u64,
        entry: PresenceEntry,
        outbound: mpsc::Sender<RelayMessage>,
    },

    Publish {
        conn: u64,
        event: String,
        payload: serde_json::Value,
    },

    /// The socket is gone.
    Untrack { conn: u64 },
}
