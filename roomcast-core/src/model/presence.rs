use crate::model::identity::Identity;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// One connected client in one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub identity: Identity,
    /// Milliseconds since the unix epoch, stamped by the client itself.
    pub joined_at: u64,
}

impl PresenceEntry {
    pub fn new(identity: Identity, joined_at: u64) -> Self {
        Self {
            identity,
            joined_at,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.identity.id
    }

    /// Whether this entry offers to `other` when both are present.
    ///
    /// The earlier arrival initiates; equal timestamps fall back to the id.
    /// Both sides evaluate the same total order, so exactly one of them
    /// ever initiates.
    pub fn initiates_toward(&self, other: &PresenceEntry) -> bool {
        (self.joined_at, &self.identity.id) < (other.joined_at, &other.identity.id)
    }
}

/// Membership notifications produced by a broadcast transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "camelCase")]
pub enum PresenceEvent {
    /// Full membership of the topic at the time of sending.
    Sync { entries: Vec<PresenceEntry> },
    Join { entry: PresenceEntry },
    Leave { peer_id: PeerId },
}
