use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The single collaboration surface a room offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Whiteboard,
    Code,
    Voice,
    Video,
}

/// Which local devices a room needs before joining the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaProfile {
    pub audio: bool,
    pub video: bool,
}

impl RoomKind {
    pub fn media_profile(self) -> Option<MediaProfile> {
        match self {
            RoomKind::Voice => Some(MediaProfile {
                audio: true,
                video: false,
            }),
            RoomKind::Video => Some(MediaProfile {
                audio: true,
                video: true,
            }),
            RoomKind::Whiteboard | RoomKind::Code => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoomKind::Whiteboard => "Whiteboard",
            RoomKind::Code => "Live Code",
            RoomKind::Voice => "Voice Chat",
            RoomKind::Video => "Video + Screen",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
    pub locked: bool,
    pub access_secret: String,
    pub capacity: u32,
    /// Clients admitted and not yet released. Gates admission and deletion.
    pub occupancy: u32,
    /// Live presence count last reported by a member. Display only.
    #[serde(default)]
    pub present: u32,
    pub created_at: u64,
}

impl Room {
    pub fn is_full(&self) -> bool {
        self.occupancy >= self.capacity
    }

    /// Topic carrying presence and, for voice/video rooms, signaling.
    pub fn presence_topic(&self) -> Topic {
        Topic::presence(&self.id)
    }
}

/// Name of a broadcast topic. Always scoped to one room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn presence(room: &RoomId) -> Self {
        Self(format!("presence-{room}"))
    }

    pub fn whiteboard(room: &RoomId) -> Self {
        Self(format!("whiteboard-{room}"))
    }

    pub fn code(room: &RoomId) -> Self {
        Self(format!("code-{room}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
