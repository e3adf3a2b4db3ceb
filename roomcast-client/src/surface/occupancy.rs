use crate::presence::PresenceSet;
use crate::store::RoomStore;
use roomcast_core::RoomId;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reports a room's live presence count to the store.
///
/// Only the store's `present` field is written; admissions are counted by
/// `admit` and `release` alone. Store failures are logged and the next
/// change tries again.
pub struct OccupancyMirror {
    task: JoinHandle<()>,
}

impl OccupancyMirror {
    pub fn spawn(
        store: Arc<dyn RoomStore>,
        room: RoomId,
        mut presence: watch::Receiver<PresenceSet>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut last = None;
            loop {
                let count = {
                    let set = presence.borrow_and_update();
                    set.is_connected().then(|| set.len() as u32)
                };

                if let Some(count) = count.filter(|count| last != Some(*count)) {
                    match store.report_presence(&room, count).await {
                        Ok(()) => {
                            debug!("Room {} has {} present", room, count);
                            last = Some(count);
                        }
                        Err(e) => warn!("Could not report presence in {}: {}", room, e),
                    }
                }

                if presence.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}
