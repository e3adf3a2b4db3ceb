use crate::error::MediaError;
use crate::media::devices::MediaDevices;
use crate::media::local_track::{LocalTrack, TrackSource};
use roomcast_core::MediaProfile;
use std::sync::Arc;
use tracing::info;

/// The local tracks of one room session.
///
/// Each device is acquired at most once. Everything still held goes back to
/// the devices when this value is released or dropped, whichever comes first.
pub struct LocalMedia {
    devices: Arc<dyn MediaDevices>,
    microphone: Option<Arc<LocalTrack>>,
    camera: Option<Arc<LocalTrack>>,
    screen: Option<Arc<LocalTrack>>,
}

impl LocalMedia {
    /// Opens the devices `profile` asks for. On failure nothing stays open.
    pub async fn acquire(
        devices: Arc<dyn MediaDevices>,
        profile: MediaProfile,
    ) -> Result<Self, MediaError> {
        let mut media = Self {
            devices,
            microphone: None,
            camera: None,
            screen: None,
        };

        if profile.audio {
            media.microphone = Some(media.devices.open(TrackSource::Microphone).await?);
        }
        if profile.video {
            media.camera = Some(media.devices.open(TrackSource::Camera).await?);
        }

        info!(
            "Acquired local media (audio: {}, video: {})",
            profile.audio, profile.video
        );
        Ok(media)
    }

    pub fn microphone(&self) -> Option<&Arc<LocalTrack>> {
        self.microphone.as_ref()
    }

    pub fn camera(&self) -> Option<&Arc<LocalTrack>> {
        self.camera.as_ref()
    }

    pub fn screen(&self) -> Option<&Arc<LocalTrack>> {
        self.screen.as_ref()
    }

    pub fn is_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// The video track peers currently receive: the screen while sharing,
    /// otherwise the camera.
    pub fn outgoing_video(&self) -> Option<&Arc<LocalTrack>> {
        self.screen.as_ref().or(self.camera.as_ref())
    }

    /// Tracks to attach to a new connection, audio first.
    pub fn tracks(&self) -> Vec<Arc<LocalTrack>> {
        self.microphone
            .iter()
            .chain(self.outgoing_video())
            .cloned()
            .collect()
    }

    /// Opens the screen. Only rooms with outgoing video can share.
    pub async fn start_screen_share(&mut self) -> Result<Arc<LocalTrack>, MediaError> {
        if self.camera.is_none() {
            return Err(MediaError::NoVideo);
        }
        if self.screen.is_some() {
            return Err(MediaError::AlreadyAcquired(TrackSource::Screen.label()));
        }

        let screen = self.devices.open(TrackSource::Screen).await?;
        self.screen = Some(screen.clone());
        Ok(screen)
    }

    /// Releases the screen and returns the camera track to send instead.
    /// `None` when nothing was being shared.
    pub fn stop_screen_share(&mut self) -> Option<Arc<LocalTrack>> {
        let screen = self.screen.take()?;
        self.devices.release(&screen);
        self.camera.clone()
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        if let Some(microphone) = &self.microphone {
            microphone.set_enabled(enabled);
        }
    }

    /// Toggles the camera. A shared screen keeps sending.
    pub fn set_video_enabled(&self, enabled: bool) {
        if let Some(camera) = &self.camera {
            camera.set_enabled(enabled);
        }
    }

    pub fn release(&mut self) {
        for track in [self.screen.take(), self.camera.take(), self.microphone.take()]
            .into_iter()
            .flatten()
        {
            self.devices.release(&track);
        }
    }
}

impl Drop for LocalMedia {
    fn drop(&mut self) {
        self.release();
    }
}
