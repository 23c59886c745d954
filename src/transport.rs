//! Transport engine capability set and its webrtc-rs implementation

mod engine;
#[cfg(test)]
pub(crate) mod fake;
mod rtc;

pub use engine::{
    CodecSpec, ConnectivityHandler, ConnectivityState, FeedbackChannel, MediaSink,
    OutboundTrack, PeerHandle, Transport, TransportError,
};
pub use rtc::WebRtcTransport;
