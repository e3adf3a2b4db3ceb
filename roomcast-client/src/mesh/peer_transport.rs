use crate::error::NegotiationError;
use crate::media::{LocalTrack, TrackKind};
use async_trait::async_trait;
use roomcast_core::{ConnectionId, IceCandidate, PeerId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use webrtc::track::track_remote::TrackRemote;

/// Coarse connectivity reported by a peer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    /// Lost for now; the transport may still recover on its own.
    Disconnected,
    Failed,
    Closed,
}

/// A media track received from a remote peer.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    /// The underlying track for playback. Absent for transports that carry
    /// no real media.
    pub rtc: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Things a transport tells its owner without being asked.
#[derive(Debug, Clone)]
pub enum PeerSignal {
    /// A local candidate to trickle to the remote side.
    IceCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    StateChanged(TransportState),
    NegotiationNeeded,
}

/// Handed to a transport at creation; every callback of the transport
/// reports through it.
#[derive(Clone)]
pub struct PeerEventSink {
    remote: PeerId,
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<PeerSignal>,
}

impl PeerEventSink {
    pub(crate) fn new(
        remote: PeerId,
        connection: ConnectionId,
        tx: mpsc::UnboundedSender<PeerSignal>,
    ) -> Self {
        Self {
            remote,
            connection,
            tx,
        }
    }

    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Returns false once nobody listens anymore.
    pub fn emit(&self, signal: PeerSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// One direct connection to one remote peer.
///
/// Every method that produces a description also applies it locally.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn add_track(&self, track: Arc<LocalTrack>) -> Result<(), NegotiationError>;

    /// Swaps the outgoing video for `track`. Returns true when the swap
    /// needs a fresh offer/answer round to take effect.
    async fn replace_video_track(&self, track: Arc<LocalTrack>) -> Result<bool, NegotiationError>;

    async fn create_offer(&self) -> Result<String, NegotiationError>;

    /// Applies a remote offer and returns the answer to send back.
    async fn accept_offer(&self, sdp: String) -> Result<String, NegotiationError>;

    async fn accept_answer(&self, sdp: String) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    async fn close(&self) -> Result<(), NegotiationError>;
}

#[async_trait]
pub trait PeerTransportFactory: Send + Sync + 'static {
    async fn create(&self, events: PeerEventSink) -> Result<Arc<dyn PeerTransport>, NegotiationError>;
}
