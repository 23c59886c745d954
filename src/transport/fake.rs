//! In-process transport engine for tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::watch;

use super::engine::{
    CodecSpec, ConnectivityHandler, ConnectivityState, FeedbackChannel, MediaSink,
    OutboundTrack, PeerHandle, Transport, TransportError,
};
use crate::signaling::{SdpType, SessionDescription};

pub(crate) const FAKE_ANSWER_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=ffrtc\r\n";

/// Sink recording every packet written to it
#[derive(Default)]
pub(crate) struct RecordingSink {
    writes: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sink = Self::new();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSink for RecordingSink {
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Write("broken pipe".to_string()));
        }
        self.writes.lock().unwrap().push(packet.to_vec());
        Ok(())
    }
}

/// Peer whose behavior is steered by the test
pub(crate) struct FakePeer {
    pub sink: Arc<RecordingSink>,
    handler: Mutex<Option<ConnectivityHandler>>,
    remote: Mutex<Option<SessionDescription>>,
    local: Mutex<Option<SessionDescription>>,
    gathering_hangs: bool,
    reject_offer: bool,
    closed: watch::Sender<bool>,
    feedback_reads: Arc<AtomicUsize>,
}

impl FakePeer {
    fn new(gathering_hangs: bool, reject_offer: bool) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            sink: RecordingSink::new(),
            handler: Mutex::new(None),
            remote: Mutex::new(None),
            local: Mutex::new(None),
            gathering_hangs,
            reject_offer,
            closed,
            feedback_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// report a connectivity change as the engine would
    pub fn emit(&self, state: ConnectivityState) {
        if let Some(handler) = self.handler.lock().unwrap().as_ref() {
            handler(state);
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn feedback_reads(&self) -> usize {
        self.feedback_reads.load(Ordering::SeqCst)
    }

    pub fn remote_offer(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerHandle for FakePeer {
    async fn add_outbound_track(&self, _codec: &CodecSpec) -> Result<OutboundTrack, TransportError> {
        Ok(OutboundTrack {
            sink: Arc::clone(&self.sink) as Arc<dyn MediaSink>,
            feedback: Box::new(FakeFeedback {
                closed: self.closed.subscribe(),
                reads: Arc::clone(&self.feedback_reads),
            }),
        })
    }

    fn on_connectivity_change(&self, handler: ConnectivityHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn gathering_complete(&self) -> BoxFuture<'static, ()> {
        if self.gathering_hangs {
            Box::pin(std::future::pending())
        } else {
            Box::pin(async {})
        }
    }

    async fn set_remote_offer(&self, offer: SessionDescription) -> Result<(), TransportError> {
        if self.reject_offer {
            return Err(TransportError::RemoteOffer("unsupported offer".to_string()));
        }
        *self.remote.lock().unwrap() = Some(offer);
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        if self.remote.lock().unwrap().is_none() {
            return Err(TransportError::CreateAnswer("no remote description".to_string()));
        }
        Ok(SessionDescription::answer(FAKE_ANSWER_SDP))
    }

    async fn set_local_answer(&self, answer: SessionDescription) -> Result<(), TransportError> {
        *self.local.lock().unwrap() = Some(answer);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.send_replace(true);
        self.emit(ConnectivityState::Closed);
        Ok(())
    }
}

struct FakeFeedback {
    closed: watch::Receiver<bool>,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedbackChannel for FakeFeedback {
    async fn recv(&mut self) -> Result<(), TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let _ = self.closed.wait_for(|closed| *closed).await;
        Err(TransportError::Closed)
    }
}

/// Engine handing out [`FakePeer`]s and remembering each of them
#[derive(Default)]
pub(crate) struct FakeTransport {
    pub peers: Mutex<Vec<Arc<FakePeer>>>,
    pub fail_create: bool,
    pub gathering_hangs: bool,
    pub reject_offer: bool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peers(&self) -> Vec<Arc<FakePeer>> {
        self.peers.lock().unwrap().clone()
    }

    pub fn peer(&self, index: usize) -> Arc<FakePeer> {
        Arc::clone(&self.peers.lock().unwrap()[index])
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn create_peer(&self) -> Result<Arc<dyn PeerHandle>, TransportError> {
        if self.fail_create {
            return Err(TransportError::CreatePeer("no network".to_string()));
        }
        let peer = Arc::new(FakePeer::new(self.gathering_hangs, self.reject_offer));
        self.peers.lock().unwrap().push(Arc::clone(&peer));
        Ok(peer)
    }
}

pub(crate) fn offer(sdp: &str) -> SessionDescription {
    SessionDescription {
        kind: SdpType::Offer,
        sdp: sdp.to_string(),
    }
}
