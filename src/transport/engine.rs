use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::signaling::SessionDescription;

/// Errors reported by the transport engine
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to initialize transport engine: {0}")]
    Setup(String),

    #[error("failed to create peer: {0}")]
    CreatePeer(String),

    #[error("failed to attach outbound track: {0}")]
    AttachTrack(String),

    #[error("failed to set remote offer: {0}")]
    RemoteOffer(String),

    #[error("failed to create answer: {0}")]
    CreateAnswer(String),

    #[error("failed to set local description: {0}")]
    LocalDescription(String),

    #[error("local description unavailable")]
    MissingLocalDescription,

    #[error("write failed: {0}")]
    Write(String),

    #[error("peer closed")]
    Closed,
}

/// Connectivity state reported by a peer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectivityState {
    /// check whether the state ends the session (disconnected, failed or closed)
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectivityState::Disconnected | ConnectivityState::Failed | ConnectivityState::Closed
        )
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityState::New => "new",
            ConnectivityState::Checking => "checking",
            ConnectivityState::Connected => "connected",
            ConnectivityState::Completed => "completed",
            ConnectivityState::Disconnected => "disconnected",
            ConnectivityState::Failed => "failed",
            ConnectivityState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Codec descriptor for the outbound track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSpec {
    pub mime_type: String,
}

impl CodecSpec {
    pub const DEFAULT_MIME_TYPE: &'static str = "video/VP8";

    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
        }
    }

    /// return "audio" or "video" from the MIME prefix
    pub fn kind(&self) -> &'static str {
        let prefix = self.mime_type.split('/').next().unwrap_or("");
        if prefix.eq_ignore_ascii_case("audio") {
            "audio"
        } else {
            "video"
        }
    }

    pub fn clock_rate(&self) -> u32 {
        match self.kind() {
            "audio" => 48_000,
            _ => 90_000,
        }
    }

    pub fn channels(&self) -> u16 {
        match self.kind() {
            "audio" => 2,
            _ => 0,
        }
    }
}

impl Default for CodecSpec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIME_TYPE)
    }
}

impl fmt::Display for CodecSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)
    }
}

pub type ConnectivityHandler = Box<dyn Fn(ConnectivityState) + Send + Sync>;

/// Outbound media destination accepting raw packets
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError>;
}

/// Return traffic of an outbound track (RTCP for webrtc-rs)
#[async_trait]
pub trait FeedbackChannel: Send {
    /// read and discard one unit of feedback; errors once the peer is closed
    async fn recv(&mut self) -> Result<(), TransportError>;
}

/// A sink attached to a peer together with its feedback channel
pub struct OutboundTrack {
    pub sink: Arc<dyn MediaSink>,
    pub feedback: Box<dyn FeedbackChannel>,
}

/// One negotiated peer connection
#[async_trait]
pub trait PeerHandle: Send + Sync {
    async fn add_outbound_track(&self, codec: &CodecSpec) -> Result<OutboundTrack, TransportError>;

    fn on_connectivity_change(&self, handler: ConnectivityHandler);

    /// start candidate gathering; the returned future resolves once it is complete
    ///
    /// Must be called before the local description is set.
    async fn gathering_complete(&self) -> BoxFuture<'static, ()>;

    async fn set_remote_offer(&self, offer: SessionDescription) -> Result<(), TransportError>;

    async fn create_answer(&self) -> Result<SessionDescription, TransportError>;

    async fn set_local_answer(&self, answer: SessionDescription) -> Result<(), TransportError>;

    async fn local_description(&self) -> Option<SessionDescription>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Factory for peer handles
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_peer(&self) -> Result<Arc<dyn PeerHandle>, TransportError>;
}
