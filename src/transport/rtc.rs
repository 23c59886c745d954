//! webrtc-rs backed transport engine

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::debug;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::{TrackLocal, TrackLocalWriter};

use super::engine::{
    CodecSpec, ConnectivityHandler, ConnectivityState, FeedbackChannel, MediaSink,
    OutboundTrack, PeerHandle, Transport, TransportError,
};
use crate::signaling::{SdpType, SessionDescription};

const STREAM_ID: &str = "ffrtc";
const RTCP_BUFFER_SIZE: usize = 1500;

pub struct WebRtcTransport {
    api: API,
    config: RTCConfiguration,
}

impl WebRtcTransport {
    /// build the engine with default codecs and interceptors
    ///
    /// `ice_servers` are STUN/TURN URLs; an empty list means host candidates only.
    pub fn new(ice_servers: &[String]) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: if ice_servers.is_empty() {
                Vec::new()
            } else {
                vec![RTCIceServer {
                    urls: ice_servers.to_vec(),
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        Ok(Self { api, config })
    }
}

#[async_trait]
impl Transport for WebRtcTransport {
    async fn create_peer(&self) -> Result<Arc<dyn PeerHandle>, TransportError> {
        let peer_connection = self
            .api
            .new_peer_connection(self.config.clone())
            .await
            .map_err(|e| TransportError::CreatePeer(e.to_string()))?;

        Ok(Arc::new(WebRtcPeer {
            peer_connection: Arc::new(peer_connection),
        }))
    }
}

struct WebRtcPeer {
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerHandle for WebRtcPeer {
    async fn add_outbound_track(&self, codec: &CodecSpec) -> Result<OutboundTrack, TransportError> {
        let track = Arc::new(TrackLocalStaticRTP::new(
            RTCRtpCodecCapability {
                mime_type: codec.mime_type.clone(),
                clock_rate: codec.clock_rate(),
                channels: codec.channels(),
                ..Default::default()
            },
            codec.kind().to_owned(),
            STREAM_ID.to_owned(),
        ));

        let sender = self
            .peer_connection
            .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| TransportError::AttachTrack(e.to_string()))?;

        Ok(OutboundTrack {
            sink: Arc::new(RtpSink { track }),
            feedback: Box::new(RtcpFeedback {
                sender,
                buf: [0u8; RTCP_BUFFER_SIZE],
            }),
        })
    }

    fn on_connectivity_change(&self, handler: ConnectivityHandler) {
        self.peer_connection
            .on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
                handler(connectivity_from(state));
                Box::pin(async {})
            }));
    }

    async fn gathering_complete(&self) -> BoxFuture<'static, ()> {
        let mut done = self.peer_connection.gathering_complete_promise().await;
        Box::pin(async move {
            let _ = done.recv().await;
        })
    }

    async fn set_remote_offer(&self, offer: SessionDescription) -> Result<(), TransportError> {
        let offer = RTCSessionDescription::offer(offer.sdp)
            .map_err(|e| TransportError::RemoteOffer(e.to_string()))?;
        self.peer_connection
            .set_remote_description(offer)
            .await
            .map_err(|e| TransportError::RemoteOffer(e.to_string()))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| TransportError::CreateAnswer(e.to_string()))?;
        description_from(answer).ok_or(TransportError::MissingLocalDescription)
    }

    async fn set_local_answer(&self, answer: SessionDescription) -> Result<(), TransportError> {
        let answer = RTCSessionDescription::answer(answer.sdp)
            .map_err(|e| TransportError::LocalDescription(e.to_string()))?;
        self.peer_connection
            .set_local_description(answer)
            .await
            .map_err(|e| TransportError::LocalDescription(e.to_string()))
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.peer_connection
            .local_description()
            .await
            .and_then(description_from)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.peer_connection
            .close()
            .await
            .map_err(|_| TransportError::Closed)
    }
}

struct RtpSink {
    track: Arc<TrackLocalStaticRTP>,
}

#[async_trait]
impl MediaSink for RtpSink {
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError> {
        self.track
            .write(packet)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}

struct RtcpFeedback {
    sender: Arc<RTCRtpSender>,
    buf: [u8; RTCP_BUFFER_SIZE],
}

#[async_trait]
impl FeedbackChannel for RtcpFeedback {
    async fn recv(&mut self) -> Result<(), TransportError> {
        // Interceptors (NACK, reports) only run when RTCP is read.
        match self.sender.read(&mut self.buf).await {
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("RTCP read ended: {}", e);
                Err(TransportError::Closed)
            }
        }
    }
}

fn connectivity_from(state: RTCIceConnectionState) -> ConnectivityState {
    match state {
        RTCIceConnectionState::Checking => ConnectivityState::Checking,
        RTCIceConnectionState::Connected => ConnectivityState::Connected,
        RTCIceConnectionState::Completed => ConnectivityState::Completed,
        RTCIceConnectionState::Disconnected => ConnectivityState::Disconnected,
        RTCIceConnectionState::Failed => ConnectivityState::Failed,
        RTCIceConnectionState::Closed => ConnectivityState::Closed,
        _ => ConnectivityState::New,
    }
}

fn description_from(desc: RTCSessionDescription) -> Option<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => return None,
    };
    Some(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}
