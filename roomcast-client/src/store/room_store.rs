use crate::error::StoreError;
use async_trait::async_trait;
use roomcast_core::{Room, RoomId, RoomKind};
use std::fmt;

pub const DEFAULT_CAPACITY: u32 = 10;

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NotFound,
    Full,
    /// The room is locked and no secret was supplied.
    SecretRequired,
    BadSecret,
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AccessDenied::NotFound => "room not found",
            AccessDenied::Full => "room is full",
            AccessDenied::SecretRequired => "room is locked",
            AccessDenied::BadSecret => "wrong access secret",
        };
        f.write_str(reason)
    }
}

/// Result of an access check. `room` is set whenever the room exists, so a
/// caller can show why it was refused.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDecision {
    pub room: Option<Room>,
    pub denied: Option<AccessDenied>,
}

impl AccessDecision {
    pub fn allow(room: Room) -> Self {
        Self {
            room: Some(room),
            denied: None,
        }
    }

    pub fn deny(reason: AccessDenied, room: Option<Room>) -> Self {
        Self {
            room,
            denied: Some(reason),
        }
    }

    pub fn allowed(&self) -> bool {
        self.denied.is_none()
    }
}

/// Checks `room` against a supplied secret. Capacity is checked first.
pub fn check_access(room: &Room, secret: Option<&str>) -> Option<AccessDenied> {
    if room.is_full() {
        return Some(AccessDenied::Full);
    }
    if !room.locked {
        return None;
    }
    match secret {
        None => Some(AccessDenied::SecretRequired),
        Some(secret) if secret == room.access_secret => None,
        Some(_) => Some(AccessDenied::BadSecret),
    }
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub kind: RoomKind,
    pub locked: bool,
    pub capacity: u32,
}

impl NewRoom {
    pub fn new(name: impl Into<String>, kind: RoomKind) -> Self {
        Self {
            name: name.into(),
            kind,
            locked: false,
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}

/// The persisted room catalogue.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Locked rooms get a generated access secret.
    async fn create_room(&self, room: NewRoom) -> Result<Room, StoreError>;

    /// Newest first.
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    async fn get_room(&self, id: &RoomId) -> Result<Room, StoreError>;

    async fn validate_access(
        &self,
        id: &RoomId,
        secret: Option<&str>,
    ) -> Result<AccessDecision, StoreError>;

    /// Like `validate_access`, and counts the caller in when allowed. The
    /// check and the increment happen as one step.
    async fn admit(&self, id: &RoomId, secret: Option<&str>) -> Result<AccessDecision, StoreError>;

    /// Counts one admitted client out again.
    async fn release(&self, id: &RoomId) -> Result<(), StoreError>;

    /// Records the live presence count a member sees. Leaves `occupancy`
    /// alone.
    async fn report_presence(&self, id: &RoomId, count: u32) -> Result<(), StoreError>;

    /// Refused with [`StoreError::Occupied`] while anyone is inside.
    async fn delete_room(&self, id: &RoomId) -> Result<(), StoreError>;
}
