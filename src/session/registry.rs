use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{Session, SessionEvent, SessionId, SessionInfo, SessionState, SessionTicket};
use crate::transport::{ConnectivityState, MediaSink, PeerHandle};

/// Outcome of one broadcast pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// sinks that accepted the packet
    pub delivered: usize,
    /// sessions removed because their write failed
    pub removed: Vec<SessionId>,
}

struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    /// probe cursor for the next allocation
    next_id: u32,
    next_generation: u64,
}

impl SessionTable {
    fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 0,
            next_generation: 0,
        }
    }

    fn allocate(&mut self) -> SessionTicket {
        // Terminates as long as fewer than 2^32 sessions are registered.
        let mut candidate = self.next_id;
        while self.sessions.contains_key(&SessionId(candidate)) {
            candidate = candidate.wrapping_add(1);
        }
        let ticket = SessionTicket {
            id: SessionId(candidate),
            generation: self.next_generation,
        };
        self.next_id = candidate.wrapping_add(1);
        self.next_generation += 1;
        self.sessions
            .insert(ticket.id, Session::placeholder(ticket.generation));
        ticket
    }

    /// session registered under `ticket`, skipping a later holder of the id
    fn current(&mut self, ticket: SessionTicket) -> Option<&mut Session> {
        self.sessions
            .get_mut(&ticket.id)
            .filter(|s| s.generation == ticket.generation)
    }

    fn holds(&self, ticket: SessionTicket) -> bool {
        self.sessions
            .get(&ticket.id)
            .is_some_and(|s| s.generation == ticket.generation)
    }

    fn remove(&mut self, id: SessionId) -> Option<SessionState> {
        let mut session = self.sessions.remove(&id)?;
        if id.0 < self.next_id {
            self.next_id = id.0;
        }

        let previous = session.state;
        session.state = SessionState::Closed;
        session.sink = None;
        info!("Closed session {} (was {})", id, previous);

        if let Some(peer) = session.peer.take() {
            tokio::spawn(async move {
                if let Err(e) = peer.close().await {
                    debug!("Closing peer of session {} failed: {}", id, e);
                }
            });
        }
        Some(previous)
    }

    fn remove_ticket(&mut self, ticket: SessionTicket) -> Option<SessionState> {
        if !self.holds(ticket) {
            return None;
        }
        self.remove(ticket.id)
    }
}

/// Exclusive hold on the registry
///
/// While a guard is alive no session can be allocated, published or
/// removed, and no broadcast pass can run.
pub struct RegistryGuard<'a> {
    table: MutexGuard<'a, SessionTable>,
}

impl RegistryGuard<'_> {
    pub fn contains(&self, id: SessionId) -> bool {
        self.table.sessions.contains_key(&id)
    }

    /// check that `ticket` still names the registered session
    pub fn holds(&self, ticket: SessionTicket) -> bool {
        self.table.holds(ticket)
    }

    pub fn state(&self, id: SessionId) -> Option<SessionState> {
        self.table.sessions.get(&id).map(|s| s.state)
    }
}

/// Sends session events to the registry's reaper
#[derive(Clone)]
pub struct SessionNotifier {
    tx: async_channel::Sender<SessionEvent>,
}

impl SessionNotifier {
    pub fn connectivity_lost(&self, ticket: SessionTicket, state: ConnectivityState) {
        let _ = self
            .tx
            .try_send(SessionEvent::ConnectivityLost { ticket, state });
    }
}

/// Registry of every session, with the id allocator and its lock
pub struct SessionRegistry {
    table: Mutex<SessionTable>,
    events_tx: async_channel::Sender<SessionEvent>,
    events_rx: async_channel::Receiver<SessionEvent>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            table: Mutex::new(SessionTable::new()),
            events_tx,
            events_rx,
        }
    }

    /// reserve the lowest free id at or after the probe cursor
    pub async fn allocate(&self) -> SessionId {
        self.reserve().await.id
    }

    /// reserve an id and return the ticket naming this registration
    pub async fn reserve(&self) -> SessionTicket {
        self.table.lock().await.allocate()
    }

    pub async fn get(&self, id: SessionId) -> Option<SessionInfo> {
        let table = self.table.lock().await;
        table
            .sessions
            .get(&id)
            .map(|s| SessionInfo { id, state: s.state })
    }

    /// store the transport handle and move the session to `Negotiating`
    ///
    /// Returns false when the session is gone or already past negotiation.
    pub async fn attach(&self, ticket: SessionTicket, peer: Arc<dyn PeerHandle>) -> bool {
        let mut table = self.table.lock().await;
        match table.current(ticket) {
            Some(session) if session.state == SessionState::Created => {
                session.peer = Some(peer);
                session.state = SessionState::Negotiating;
                debug!("Session {} negotiating", ticket);
                true
            }
            _ => false,
        }
    }

    /// fill in handle and sink and make the session a broadcast target
    ///
    /// A no-op returning false when the session was removed meanwhile.
    pub async fn publish(
        &self,
        ticket: SessionTicket,
        peer: Arc<dyn PeerHandle>,
        sink: Arc<dyn MediaSink>,
    ) -> bool {
        let mut table = self.table.lock().await;
        match table.current(ticket) {
            Some(session)
                if matches!(
                    session.state,
                    SessionState::Created | SessionState::Negotiating
                ) =>
            {
                session.peer = Some(peer);
                session.sink = Some(sink);
                session.state = SessionState::Active;
                info!("Session {} active", ticket.id);
                true
            }
            _ => false,
        }
    }

    /// delete the session if present and close its transport handle
    ///
    /// Returns the state the session was in; `None` if it was not registered.
    pub async fn remove(&self, id: SessionId) -> Option<SessionState> {
        self.table.lock().await.remove(id)
    }

    /// remove the session only while `ticket` still names it
    pub async fn remove_ticket(&self, ticket: SessionTicket) -> Option<SessionState> {
        self.table.lock().await.remove_ticket(ticket)
    }

    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            table: self.table.lock().await,
        }
    }

    /// write `packet` to every active session
    ///
    /// The whole pass runs under the registry lock. Sessions whose write
    /// fails are removed once the pass is done; the others still receive
    /// the packet.
    pub async fn broadcast(&self, packet: &[u8]) -> BroadcastReport {
        let mut table = self.table.lock().await;
        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for (id, session) in table.sessions.iter() {
            let Some(sink) = session.active_sink() else {
                continue;
            };
            match sink.write(packet).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Write to session {} failed: {}", id, e);
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            if table.remove(id).is_some() {
                report.removed.push(id);
            }
        }
        report
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn active_count(&self) -> usize {
        let table = self.table.lock().await;
        table
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Active)
            .count()
    }

    /// snapshot of all sessions, ordered by id
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let table = self.table.lock().await;
        let mut sessions: Vec<SessionInfo> = table
            .sessions
            .iter()
            .map(|(id, s)| SessionInfo {
                id: *id,
                state: s.state,
            })
            .collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    pub fn notifier(&self) -> SessionNotifier {
        SessionNotifier {
            tx: self.events_tx.clone(),
        }
    }

    /// spawn the task applying session events to the registry
    ///
    /// An event whose ticket no longer matches (the id was freed and handed
    /// to a new session) is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let rx = self.events_rx.clone();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                match event {
                    SessionEvent::ConnectivityLost { ticket, state } => {
                        if registry.remove_ticket(ticket).await.is_some() {
                            info!("Session {} removed after connectivity {}", ticket.id, state);
                        } else {
                            debug!("Ignoring connectivity {} of stale session {}", state, ticket);
                        }
                    }
                }
            }
        })
    }
}
