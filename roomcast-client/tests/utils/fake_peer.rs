use async_trait::async_trait;
use roomcast_client::NegotiationError;
use roomcast_client::media::{LocalTrack, TrackKind};
use roomcast_client::mesh::{
    PeerEventSink, PeerSignal, PeerTransport, PeerTransportFactory, RemoteTrack, TransportState,
};
use roomcast_core::{ConnectionId, IceCandidate, PeerId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Peer transport that negotiates instantly and carries no media.
///
/// Every description it produces comes with one local candidate, and it
/// reports itself connected (with one remote video track) as soon as a
/// remote description is applied.
pub struct FakePeerTransport {
    events: PeerEventSink,
    tracks: Mutex<Vec<String>>,
    video: Mutex<Option<String>>,
    descriptions: AtomicUsize,
    offers: AtomicUsize,
    remote_applied: AtomicBool,
    candidates: AtomicUsize,
    closed: AtomicBool,
}

impl FakePeerTransport {
    fn new(events: PeerEventSink) -> Self {
        Self {
            events,
            tracks: Mutex::new(Vec::new()),
            video: Mutex::new(None),
            descriptions: AtomicUsize::new(0),
            offers: AtomicUsize::new(0),
            remote_applied: AtomicBool::new(false),
            candidates: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> &PeerId {
        self.events.remote()
    }

    pub fn connection(&self) -> ConnectionId {
        self.events.connection()
    }

    /// Ids of every local track attached, in order.
    pub fn tracks(&self) -> Vec<String> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn video(&self) -> Option<String> {
        self.video.lock().unwrap().clone()
    }

    pub fn offers(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }

    pub fn applied_candidates(&self) -> usize {
        self.candidates.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn description(&self, kind: &str) -> String {
        let n = self.descriptions.fetch_add(1, Ordering::SeqCst);
        self.events.emit(PeerSignal::IceCandidate(IceCandidate {
            candidate: format!("candidate:{} 1 udp 1 127.0.0.1 {} typ host", n, 9000 + n),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        }));
        format!("v=0 {} {} #{}", kind, self.connection(), n)
    }

    fn remote_applied(&self) {
        if self.remote_applied.swap(true, Ordering::SeqCst) {
            return;
        }
        self.events
            .emit(PeerSignal::StateChanged(TransportState::Connected));
        self.events.emit(PeerSignal::RemoteTrack(RemoteTrack {
            id: format!("video-of-{}", self.remote()),
            stream_id: self.remote().to_string(),
            kind: TrackKind::Video,
            rtc: None,
        }));
    }
}

#[async_trait]
impl PeerTransport for FakePeerTransport {
    async fn add_track(&self, track: Arc<LocalTrack>) -> Result<(), NegotiationError> {
        if track.kind() == TrackKind::Video {
            *self.video.lock().unwrap() = Some(track.id().to_owned());
        }
        self.tracks.lock().unwrap().push(track.id().to_owned());
        Ok(())
    }

    async fn replace_video_track(&self, track: Arc<LocalTrack>) -> Result<bool, NegotiationError> {
        let mut video = self.video.lock().unwrap();
        let had_video = video.is_some();
        *video = Some(track.id().to_owned());
        if !had_video {
            self.tracks.lock().unwrap().push(track.id().to_owned());
        }
        Ok(!had_video)
    }

    async fn create_offer(&self) -> Result<String, NegotiationError> {
        self.offers.fetch_add(1, Ordering::SeqCst);
        Ok(self.description("offer"))
    }

    async fn accept_offer(&self, _sdp: String) -> Result<String, NegotiationError> {
        let answer = self.description("answer");
        self.remote_applied();
        Ok(answer)
    }

    async fn accept_answer(&self, _sdp: String) -> Result<(), NegotiationError> {
        self.remote_applied();
        Ok(())
    }

    async fn add_ice_candidate(&self, _candidate: IceCandidate) -> Result<(), NegotiationError> {
        if !self.remote_applied.load(Ordering::SeqCst) {
            return Err(NegotiationError::RemoteDescriptionMissing);
        }
        self.candidates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`FakePeerTransport`]s and remembers every one of them.
#[derive(Default)]
pub struct FakePeerFactory {
    created: Mutex<Vec<Arc<FakePeerTransport>>>,
}

impl FakePeerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<Arc<FakePeerTransport>> {
        self.created.lock().unwrap().clone()
    }

    pub fn toward(&self, remote: &PeerId) -> Vec<Arc<FakePeerTransport>> {
        self.created()
            .into_iter()
            .filter(|transport| transport.remote() == remote)
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.created().iter().filter(|t| !t.is_closed()).count()
    }
}

#[async_trait]
impl PeerTransportFactory for FakePeerFactory {
    async fn create(&self, events: PeerEventSink) -> Result<Arc<dyn PeerTransport>, NegotiationError> {
        let transport = Arc::new(FakePeerTransport::new(events));
        self.created.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}
