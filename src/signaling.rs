//! WebSocket signaling: one offer in, one answer out per connection

mod channel;
mod handler;
mod messages;
mod server;
mod types;

pub use channel::SignalingChannel;
pub use handler::{HandshakeOptions, SignalingHandler};
pub use messages::{SdpType, SessionDescription};
pub use server::{DEFAULT_SIGNALING_ADDR, DEFAULT_SIGNALING_PATH, SignalingServer};
pub use types::SignalingError;
