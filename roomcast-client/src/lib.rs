pub mod channel;
pub mod config;
pub mod error;
pub mod identity;
pub mod media;
pub mod mesh;
pub mod presence;
pub mod session;
pub mod signaling;
pub mod store;
pub mod surface;

pub use channel::{BroadcastChannel, BroadcastTransport, LocalHub, LocalHubConfig, WsTransport};
pub use config::SessionConfig;
pub use error::{
    ChannelError, IdentityError, MediaError, NegotiationError, SessionError, StoreError,
};
pub use identity::IdentityStore;
pub use media::{LocalMedia, MediaDevices, SampleDevices, TrackSource};
pub use mesh::{MeshEvent, MeshManager, MeshSnapshot, PeerState, RtcPeerFactory, ShutdownReport};
pub use presence::{PresenceChange, PresenceSet, PresenceTracker};
pub use session::{JoinOutcome, LeaveReport, RoomSession, RoomSurface, SessionContext};
pub use store::{AccessDecision, AccessDenied, InMemoryRoomStore, NewRoom, RoomStore};
pub use surface::{Board, CodeSync, Remote, WhiteboardSync, Workspace};
