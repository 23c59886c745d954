use thiserror::Error;
use tokio_tungstenite::tungstenite;

use super::messages::SdpType;
use crate::session::SessionId;
use crate::transport::TransportError;

/// Failures that end one signaling connection
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("invalid session description: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection closed before an offer arrived")]
    MissingOffer,

    #[error("expected an offer, got {0}")]
    UnexpectedSdpType(SdpType),

    #[error("no offer within the configured timeout")]
    OfferTimeout,

    #[error("candidate gathering did not complete within the configured timeout")]
    GatheringTimeout,

    #[error("session {0} was removed during the handshake")]
    SessionRemoved(SessionId),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
