use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::SignalingError;

/// SDP message type, as in the browser's `RTCSdpType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
            SdpType::Pranswer => "pranswer",
            SdpType::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Session description exchanged over the signaling socket
///
/// Same JSON shape as `RTCPeerConnection.localDescription`:
/// `{"type": "offer", "sdp": "v=0..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// decode a remote offer; any other description type is rejected
    pub fn parse_offer(text: &str) -> Result<Self, SignalingError> {
        let desc: SessionDescription = serde_json::from_str(text)?;
        match desc.kind {
            SdpType::Offer => Ok(desc),
            other => Err(SignalingError::UnexpectedSdpType(other)),
        }
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        Ok(serde_json::to_string(self)?)
    }
}
