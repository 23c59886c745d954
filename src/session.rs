//! Session registry shared by the signaling handler and the media broadcaster

mod registry;
mod types;

pub use registry::{BroadcastReport, RegistryGuard, SessionNotifier, SessionRegistry};
pub use types::{SessionEvent, SessionId, SessionInfo, SessionState, SessionTicket};
