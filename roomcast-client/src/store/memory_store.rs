use crate::error::StoreError;
use crate::store::room_store::{AccessDecision, AccessDenied, NewRoom, RoomStore, check_access};
use async_trait::async_trait;
use dashmap::DashMap;
use roomcast_core::utils::now_millis;
use roomcast_core::{Room, RoomId};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

const SECRET_LEN: usize = 6;

struct StoredRoom {
    seq: u64,
    room: Room,
}

/// Room store living in process memory.
///
/// Admission holds the room's map entry while it checks and increments, so
/// concurrent joins can never push a room over its capacity.
#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: DashMap<RoomId, StoredRoom>,
    next_seq: AtomicU64,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn generate_secret() -> String {
    Uuid::new_v4().simple().to_string()[..SECRET_LEN].to_uppercase()
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn create_room(&self, new: NewRoom) -> Result<Room, StoreError> {
        let room = Room {
            id: RoomId::new(),
            name: new.name,
            kind: new.kind,
            locked: new.locked,
            access_secret: if new.locked { generate_secret() } else { String::new() },
            capacity: new.capacity,
            occupancy: 0,
            present: 0,
            created_at: now_millis(),
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rooms.insert(
            room.id.clone(),
            StoredRoom {
                seq,
                room: room.clone(),
            },
        );
        info!("Created {} room '{}' ({})", room.kind.label(), room.name, room.id);
        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let mut rooms: Vec<(u64, Room)> = self
            .rooms
            .iter()
            .map(|stored| (stored.seq, stored.room.clone()))
            .collect();
        rooms.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rooms.into_iter().map(|(_, room)| room).collect())
    }

    async fn get_room(&self, id: &RoomId) -> Result<Room, StoreError> {
        self.rooms
            .get(id)
            .map(|stored| stored.room.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn validate_access(
        &self,
        id: &RoomId,
        secret: Option<&str>,
    ) -> Result<AccessDecision, StoreError> {
        let Some(stored) = self.rooms.get(id) else {
            return Ok(AccessDecision::deny(AccessDenied::NotFound, None));
        };
        let room = stored.room.clone();

        Ok(match check_access(&room, secret) {
            Some(reason) => AccessDecision::deny(reason, Some(room)),
            None => AccessDecision::allow(room),
        })
    }

    async fn admit(&self, id: &RoomId, secret: Option<&str>) -> Result<AccessDecision, StoreError> {
        let Some(mut stored) = self.rooms.get_mut(id) else {
            return Ok(AccessDecision::deny(AccessDenied::NotFound, None));
        };

        if let Some(reason) = check_access(&stored.room, secret) {
            debug!("Refused join of {}: {}", id, reason);
            return Ok(AccessDecision::deny(reason, Some(stored.room.clone())));
        }

        stored.room.occupancy += 1;
        Ok(AccessDecision::allow(stored.room.clone()))
    }

    async fn release(&self, id: &RoomId) -> Result<(), StoreError> {
        let mut stored = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.room.occupancy = stored.room.occupancy.saturating_sub(1);
        Ok(())
    }

    async fn report_presence(&self, id: &RoomId, count: u32) -> Result<(), StoreError> {
        let mut stored = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.room.present = count;
        Ok(())
    }

    async fn delete_room(&self, id: &RoomId) -> Result<(), StoreError> {
        let removed = self
            .rooms
            .remove_if(id, |_, stored| stored.room.occupancy == 0);
        if removed.is_some() {
            info!("Deleted room {}", id);
            return Ok(());
        }

        if self.rooms.contains_key(id) {
            Err(StoreError::Occupied(id.clone()))
        } else {
            Err(StoreError::NotFound(id.clone()))
        }
    }
}
