use crate::channel::BroadcastChannel;
use roomcast_core::{ConnectionId, IceCandidate, PeerId, SignalMessage};
use tracing::{debug, warn};

/// Where the mesh sends its negotiation messages.
pub trait SignalingOutput: Send + Sync {
    fn send_offer(&self, target: PeerId, connection: ConnectionId, sdp: String);

    fn send_answer(&self, target: PeerId, connection: ConnectionId, sdp: String);

    fn send_ice(&self, target: PeerId, connection: ConnectionId, candidate: IceCandidate);
}

/// Publishes signaling on a room's presence channel. Every member receives
/// it; only the addressed one acts.
#[derive(Clone)]
pub struct ChannelSignaling {
    channel: BroadcastChannel,
}

impl ChannelSignaling {
    pub fn new(channel: BroadcastChannel) -> Self {
        Self { channel }
    }

    fn send(&self, message: SignalMessage) {
        let kind = message.kind();
        debug!("Sending '{}' to {:?}", kind, message.target);
        if let Err(e) = self.channel.publish(kind, &message) {
            warn!("Failed to publish '{}': {}", kind, e);
        }
    }

    fn local(&self) -> PeerId {
        self.channel.local_id().clone()
    }
}

impl SignalingOutput for ChannelSignaling {
    fn send_offer(&self, target: PeerId, connection: ConnectionId, sdp: String) {
        self.send(SignalMessage::offer(self.local(), target, connection, sdp));
    }

    fn send_answer(&self, target: PeerId, connection: ConnectionId, sdp: String) {
        self.send(SignalMessage::answer(self.local(), target, connection, sdp));
    }

    fn send_ice(&self, target: PeerId, connection: ConnectionId, candidate: IceCandidate) {
        self.send(SignalMessage::ice_candidate(
            self.local(),
            target,
            connection,
            candidate,
        ));
    }
}
