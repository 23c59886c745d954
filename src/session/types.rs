use std::fmt;
use std::sync::Arc;

use crate::transport::{ConnectivityState, MediaSink, PeerHandle};

/// Session identifier, unique among registered sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl SessionId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SessionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// One registration of a session id
///
/// Ids are reused after removal; the generation tells two holders of the
/// same id apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTicket {
    pub id: SessionId,
    pub generation: u64,
}

impl fmt::Display for SessionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.generation)
    }
}

/// Session lifecycle
///
/// `Created -> Negotiating -> Active`, and any state may end in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Placeholder reserved, no transport handle yet
    Created,
    /// Handle and sink exist, handshake in flight
    Negotiating,
    /// Handshake complete, sink receives broadcast packets
    Active,
    /// Removed from the registry
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Negotiating => "negotiating",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Snapshot of a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub state: SessionState,
}

/// Events delivered to the registry's removal path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectivityLost {
        ticket: SessionTicket,
        state: ConnectivityState,
    },
}

pub(crate) struct Session {
    pub generation: u64,
    pub state: SessionState,
    pub peer: Option<Arc<dyn PeerHandle>>,
    pub sink: Option<Arc<dyn MediaSink>>,
}

impl Session {
    pub fn placeholder(generation: u64) -> Self {
        Self {
            generation,
            state: SessionState::Created,
            peer: None,
            sink: None,
        }
    }

    /// return the sink of an `Active` session; `None` for every other state
    pub fn active_sink(&self) -> Option<&Arc<dyn MediaSink>> {
        match self.state {
            SessionState::Active => self.sink.as_ref(),
            _ => None,
        }
    }
}
