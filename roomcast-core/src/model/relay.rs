use crate::model::frame::Frame;
use crate::model::presence::{PresenceEntry, PresenceEvent};
use serde::{Deserialize, Serialize};

/// Wire protocol between a client and the WebSocket relay.
///
/// One socket carries exactly one topic. The first message a client sends
/// must be `Track`; the relay answers with a `Presence` sync and from then on
/// forwards every frame published on the topic, the sender's own included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum RelayMessage {
    Track {
        entry: PresenceEntry,
    },
    Publish {
        event: String,
        payload: serde_json::Value,
    },
    Frame(Frame),
    Presence(PresenceEvent),
}
