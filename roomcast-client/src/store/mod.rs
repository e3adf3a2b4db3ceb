mod memory_store;
mod room_store;

pub use memory_store::InMemoryRoomStore;
pub use room_store::{
    AccessDecision, AccessDenied, DEFAULT_CAPACITY, NewRoom, RoomStore, check_access,
};
