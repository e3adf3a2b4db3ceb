mod devices;
mod local_media;
mod local_track;

pub use devices::{MediaDevices, SampleDevices};
pub use local_media::LocalMedia;
pub use local_track::{LocalTrack, TrackKind, TrackSource};
