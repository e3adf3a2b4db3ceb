use crate::error::NegotiationError;
use crate::media::{LocalTrack, TrackKind};
use crate::mesh::peer_transport::{
    PeerEventSink, PeerSignal, PeerTransport, PeerTransportFactory, RemoteTrack, TransportState,
};
use async_trait::async_trait;
use roomcast_core::{IceCandidate, IceServerConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Builds `webrtc` peer connections.
#[derive(Clone)]
pub struct RtcPeerFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcPeerFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerTransportFactory for RtcPeerFactory {
    async fn create(&self, events: PeerEventSink) -> Result<Arc<dyn PeerTransport>, NegotiationError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(self.rtc_configuration()).await?);
        register_callbacks(&peer_connection, &events);

        info!(
            "Created peer connection {} toward {}",
            events.connection(),
            events.remote()
        );
        Ok(Arc::new(RtcPeerTransport { peer_connection }))
    }
}

fn register_callbacks(peer_connection: &RTCPeerConnection, events: &PeerEventSink) {
    let state_events = events.clone();
    peer_connection.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        let events = state_events.clone();
        Box::pin(async move {
            debug!("Connection state toward {}: {:?}", events.remote(), s);
            let state = match s {
                RTCPeerConnectionState::Connecting => TransportState::Connecting,
                RTCPeerConnectionState::Connected => TransportState::Connected,
                RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                RTCPeerConnectionState::Failed => TransportState::Failed,
                RTCPeerConnectionState::Closed => TransportState::Closed,
                _ => return,
            };
            events.emit(PeerSignal::StateChanged(state));
        })
    }));

    let ice_events = events.clone();
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let events = ice_events.clone();
        Box::pin(async move {
            let Some(candidate) = c else { return };
            let init = match candidate.to_json() {
                Ok(init) => init,
                Err(e) => {
                    warn!("Could not serialize local candidate: {}", e);
                    return;
                }
            };
            events.emit(PeerSignal::IceCandidate(IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
                username_fragment: init.username_fragment,
            }));
        })
    }));

    let track_events = events.clone();
    peer_connection.on_track(Box::new(
        move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
            let events = track_events.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Video,
                };
                events.emit(PeerSignal::RemoteTrack(RemoteTrack {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                    rtc: Some(track),
                }));
            })
        },
    ));

    let negotiation_events = events.clone();
    peer_connection.on_negotiation_needed(Box::new(move || {
        let events = negotiation_events.clone();
        Box::pin(async move {
            events.emit(PeerSignal::NegotiationNeeded);
        })
    }));
}

/// A `webrtc` peer connection.
pub struct RtcPeerTransport {
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerTransport for RtcPeerTransport {
    async fn add_track(&self, track: Arc<LocalTrack>) -> Result<(), NegotiationError> {
        self.peer_connection
            .add_track(track.rtc() as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        Ok(())
    }

    async fn replace_video_track(&self, track: Arc<LocalTrack>) -> Result<bool, NegotiationError> {
        for sender in self.peer_connection.get_senders().await {
            let Some(current) = sender.track().await else {
                continue;
            };
            if current.kind() != RTPCodecType::Video {
                continue;
            }
            sender
                .replace_track(Some(track.rtc() as Arc<dyn TrackLocal + Send + Sync>))
                .await?;
            return Ok(false);
        }

        // No video sender yet: the track needs a new m-line.
        self.add_track(track).await?;
        Ok(true)
    }

    async fn create_offer(&self) -> Result<String, NegotiationError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection.set_local_description(offer.clone()).await?;
        Ok(offer.sdp)
    }

    async fn accept_offer(&self, sdp: String) -> Result<String, NegotiationError> {
        let offer = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(offer).await?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn accept_answer(&self, sdp: String) -> Result<(), NegotiationError> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(answer).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        if self.peer_connection.remote_description().await.is_none() {
            return Err(NegotiationError::RemoteDescriptionMissing);
        }
        self.peer_connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
