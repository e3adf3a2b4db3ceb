use crate::mesh::peer_link::PeerState;
use crate::mesh::peer_transport::RemoteTrack;
use roomcast_core::{ConnectionId, PeerId};
use std::collections::BTreeSet;

/// Everything the mesh tells the layers above it.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    PeerState {
        peer_id: PeerId,
        connection: ConnectionId,
        state: PeerState,
    },

    /// A playable track arrived from `peer_id`.
    RemoteTrack { peer_id: PeerId, track: RemoteTrack },

    /// The connection is gone, along with every track it delivered.
    PeerClosed {
        peer_id: PeerId,
        connection: ConnectionId,
    },

    /// A remote peer started or stopped sharing its screen.
    ShareStatus { peer_id: PeerId, sharing: bool },

    /// The local screen capture ended by itself; the camera is back.
    ScreenShareEnded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub peer_id: PeerId,
    pub connection: ConnectionId,
    pub state: PeerState,
    pub initiator: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MeshSnapshot {
    pub peers: Vec<PeerSnapshot>,
    /// Remote peers currently sharing a screen.
    pub sharing: BTreeSet<PeerId>,
    pub local_sharing: bool,
    /// Id of the video track peers receive from us.
    pub outgoing_video: Option<String>,
    pub media_available: bool,
}

impl MeshSnapshot {
    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|peer| peer.peer_id == *peer_id)
    }
}

/// Outcome of tearing a mesh down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub closed_connections: usize,
    /// Remote candidates that were still waiting for a description.
    pub discarded_candidates: usize,
}
