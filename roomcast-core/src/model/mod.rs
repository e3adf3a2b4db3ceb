mod frame;
mod identity;
mod peer;
mod presence;
mod relay;
mod room;
mod signaling;
mod surface;

pub use frame::Frame;
pub use identity::{Identity, MAX_DISPLAY_NAME_CHARS, normalize_display_name};
pub use peer::{ParsePeerIdError, PeerId};
pub use presence::{PresenceEntry, PresenceEvent};
pub use relay::RelayMessage;
pub use room::{MediaProfile, Room, RoomId, RoomKind, Topic};
pub use signaling::{
    ConnectionId, IceCandidate, IceServerConfig, ShareStatus, SignalBody, SignalMessage,
};
pub use surface::{BoardEvent, CodeEvent, DrawPoint, StickyNote, StrokePhase};
