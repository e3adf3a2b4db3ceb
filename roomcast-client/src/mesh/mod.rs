mod mesh_command;
mod mesh_event;
mod mesh_manager;
mod peer_link;
mod peer_transport;
mod rtc_transport;

pub use mesh_event::{MeshEvent, MeshSnapshot, PeerSnapshot, ShutdownReport};
pub use mesh_manager::{MeshManager, MeshParams};
pub use peer_link::PeerState;
pub use peer_transport::{
    PeerEventSink, PeerSignal, PeerTransport, PeerTransportFactory, RemoteTrack, TransportState,
};
pub use rtc_transport::{RtcPeerFactory, RtcPeerTransport};
