use crate::error::MediaError;
use crate::media::local_track::{LocalTrack, TrackSource};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Access to the local capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync + 'static {
    /// Opens `source`, asking for permission if the platform requires it.
    async fn open(&self, source: TrackSource) -> Result<Arc<LocalTrack>, MediaError>;

    /// Gives the device behind `track` back to the system.
    fn release(&self, track: &LocalTrack);
}

/// Devices whose tracks are fed by the application through
/// [`LocalTrack::write_sample`]. Used by headless clients and tests.
#[derive(Default)]
pub struct SampleDevices {
    denied: Mutex<HashSet<TrackSource>>,
    open: DashMap<TrackSource, usize>,
    next_id: AtomicU64,
}

impl SampleDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `open` of `source` fail as if permission was refused.
    pub fn deny(&self, source: TrackSource) {
        self.denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source);
    }

    pub fn allow(&self, source: TrackSource) {
        self.denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&source);
    }

    /// Number of currently open tracks from `source`.
    pub fn open_count(&self, source: TrackSource) -> usize {
        self.open.get(&source).map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl MediaDevices for SampleDevices {
    async fn open(&self, source: TrackSource) -> Result<Arc<LocalTrack>, MediaError> {
        let denied = self
            .denied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&source);
        if denied {
            return Err(MediaError::PermissionDenied(source.label()));
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let track = Arc::new(LocalTrack::new(
            format!("{source}-{n}"),
            source,
            "roomcast",
        ));
        *self.open.entry(source).or_insert(0) += 1;

        info!("Opened {} as track {}", source, track.id());
        Ok(track)
    }

    fn release(&self, track: &LocalTrack) {
        if let Some(mut count) = self.open.get_mut(&track.source()) {
            *count = count.saturating_sub(1);
        }
        debug!("Released track {}", track.id());
    }
}
