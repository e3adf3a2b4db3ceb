use crate::model::peer::PeerId;
use crate::model::presence::PresenceEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Identifies one peer-connection instance between two peers.
///
/// Chosen by the side that creates the connection and echoed on every
/// answer and candidate, so messages meant for a replaced connection can be
/// told apart from messages for the current one.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trickle ICE candidate in the browser's `toJSON()` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum SignalBody {
    Join {
        entry: PresenceEntry,
    },
    Leave,
    Offer {
        connection: ConnectionId,
        sdp: String,
    },
    Answer {
        connection: ConnectionId,
        sdp: String,
    },
    IceCandidate {
        connection: ConnectionId,
        candidate: IceCandidate,
    },
}

impl SignalBody {
    /// Event name the message is published under.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalBody::Join { .. } => SignalMessage::JOIN,
            SignalBody::Leave => SignalMessage::LEAVE,
            SignalBody::Offer { .. } => SignalMessage::OFFER,
            SignalBody::Answer { .. } => SignalMessage::ANSWER,
            SignalBody::IceCandidate { .. } => SignalMessage::ICE_CANDIDATE,
        }
    }
}

/// Everything exchanged on a room's presence topic.
///
/// `target` is `None` for the broadcast kinds (`join`, `leave`) and set for
/// the addressed kinds. The channel has no private addressing: every peer
/// sees every message and drops the ones not targeted at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub sender: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PeerId>,
    pub body: SignalBody,
}

impl SignalMessage {
    pub const JOIN: &'static str = "join";
    pub const LEAVE: &'static str = "leave";
    pub const OFFER: &'static str = "offer";
    pub const ANSWER: &'static str = "answer";
    pub const ICE_CANDIDATE: &'static str = "ice-candidate";

    /// Event names consumed by the peer mesh.
    pub const NEGOTIATION_EVENTS: [&'static str; 3] =
        [Self::OFFER, Self::ANSWER, Self::ICE_CANDIDATE];

    pub fn join(entry: PresenceEntry) -> Self {
        Self {
            sender: entry.identity.id.clone(),
            target: None,
            body: SignalBody::Join { entry },
        }
    }

    pub fn leave(sender: PeerId) -> Self {
        Self {
            sender,
            target: None,
            body: SignalBody::Leave,
        }
    }

    pub fn offer(sender: PeerId, target: PeerId, connection: ConnectionId, sdp: String) -> Self {
        Self {
            sender,
            target: Some(target),
            body: SignalBody::Offer { connection, sdp },
        }
    }

    pub fn answer(sender: PeerId, target: PeerId, connection: ConnectionId, sdp: String) -> Self {
        Self {
            sender,
            target: Some(target),
            body: SignalBody::Answer { connection, sdp },
        }
    }

    pub fn ice_candidate(
        sender: PeerId,
        target: PeerId,
        connection: ConnectionId,
        candidate: IceCandidate,
    ) -> Self {
        Self {
            sender,
            target: Some(target),
            body: SignalBody::IceCandidate {
                connection,
                candidate,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    /// True when `local` must act on this message.
    pub fn is_addressed_to(&self, local: &PeerId) -> bool {
        self.sender != *local && self.target.as_ref() == Some(local)
    }
}

/// Out-of-band notice that a peer started or stopped sharing its screen.
/// Used for layout only; never affects connection topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareStatus {
    pub sender: PeerId,
    pub sharing: bool,
}

impl ShareStatus {
    pub const EVENT: &'static str = "share-status";
}
