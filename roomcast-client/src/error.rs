use roomcast_core::{RoomId, RoomKind, Topic};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel {0} is closed")]
    Closed(Topic),

    #[error("failed to connect topic {topic}: {reason}")]
    Connect { topic: Topic, reason: String },

    #[error("payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("permission to use the {0} was denied")]
    PermissionDenied(&'static str),

    #[error("no {0} is available")]
    Unavailable(&'static str),

    #[error("{0} is already in use by this session")]
    AlreadyAcquired(&'static str),

    #[error("this room has no outgoing video to replace")]
    NoVideo,
}

/// A single description or candidate that could not be applied.
/// Never tears the surrounding connection down.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),

    #[error("remote description has not been applied yet")]
    RemoteDescriptionMissing,

    #[error("connection is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} still has active users")]
    Occupied(RoomId),

    #[error("room store unavailable: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("identity file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("a {} room has no calls", .0.label())]
    NotACallRoom(RoomKind),

    #[error("session task stopped before answering")]
    Stopped,
}
