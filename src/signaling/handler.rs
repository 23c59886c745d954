use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::channel::SignalingChannel;
use super::messages::SessionDescription;
use super::types::SignalingError;
use crate::session::{SessionId, SessionRegistry, SessionTicket};
use crate::transport::{
    CodecSpec, ConnectivityState, FeedbackChannel, Transport, TransportError,
};

/// Optional bounds on the two open-ended waits of a handshake
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeOptions {
    pub offer_timeout: Option<Duration>,
    pub gathering_timeout: Option<Duration>,
}

/// Offer/answer handshake driver, one run per signaling connection
pub struct SignalingHandler {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
    codec: CodecSpec,
    options: HandshakeOptions,
}

impl SignalingHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        transport: Arc<dyn Transport>,
        codec: CodecSpec,
        options: HandshakeOptions,
    ) -> Self {
        Self {
            registry,
            transport,
            codec,
            options,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// handle one connection from start to close
    ///
    /// On failure the session is removed and the channel closed without an
    /// answer. The channel is closed on every path.
    pub async fn handle<C: SignalingChannel>(
        &self,
        mut channel: C,
        addr: SocketAddr,
    ) -> Result<SessionId, SignalingError> {
        let ticket = self.registry.reserve().await;
        info!("Created session {} for {}", ticket.id, addr);

        let result = self.negotiate(ticket, &mut channel).await;
        channel.close().await;

        match result {
            Ok(()) => Ok(ticket.id),
            Err(e) => {
                self.registry.remove_ticket(ticket).await;
                Err(e)
            }
        }
    }

    async fn negotiate<C: SignalingChannel>(
        &self,
        ticket: SessionTicket,
        channel: &mut C,
    ) -> Result<(), SignalingError> {
        let id = ticket.id;
        let peer = self.transport.create_peer().await?;
        if !self.registry.attach(ticket, Arc::clone(&peer)).await {
            // Nothing else owns the handle yet.
            if let Err(e) = peer.close().await {
                debug!("Closing unattached peer of session {} failed: {}", id, e);
            }
            return Err(SignalingError::SessionRemoved(id));
        }
        let track = peer.add_outbound_track(&self.codec).await?;

        let notifier = self.registry.notifier();
        peer.on_connectivity_change(Box::new(move |state: ConnectivityState| {
            debug!("Session {} connectivity: {}", ticket, state);
            if state.is_terminal() {
                notifier.connectivity_lost(ticket, state);
            }
        }));

        tokio::spawn(drain_feedback(id, track.feedback));

        let text = bounded(
            self.options.offer_timeout,
            channel.recv_text(),
            SignalingError::OfferTimeout,
        )
        .await??
        .ok_or(SignalingError::MissingOffer)?;
        let offer = SessionDescription::parse_offer(&text)?;
        debug!("Session {} received offer ({} bytes)", id, offer.sdp.len());

        let gathered = {
            let guard = self.registry.lock().await;
            if !guard.holds(ticket) {
                return Err(SignalingError::SessionRemoved(id));
            }
            let gathered = peer.gathering_complete().await;
            peer.set_remote_offer(offer).await?;
            let answer = peer.create_answer().await?;
            peer.set_local_answer(answer).await?;
            gathered
        };

        bounded(
            self.options.gathering_timeout,
            gathered,
            SignalingError::GatheringTimeout,
        )
        .await?;

        let local = peer
            .local_description()
            .await
            .ok_or(TransportError::MissingLocalDescription)?;

        if !self
            .registry
            .publish(ticket, Arc::clone(&peer), Arc::clone(&track.sink))
            .await
        {
            return Err(SignalingError::SessionRemoved(id));
        }

        channel.send_text(local.to_json()?).await?;
        debug!("Session {} answer sent", id);
        Ok(())
    }
}

/// keep reading transport feedback until the peer closes
async fn drain_feedback(id: SessionId, mut feedback: Box<dyn FeedbackChannel>) {
    while feedback.recv().await.is_ok() {}
    debug!("Feedback drain for session {} ended", id);
}

async fn bounded<F: Future>(
    limit: Option<Duration>,
    fut: F,
    on_timeout: SignalingError,
) -> Result<F::Output, SignalingError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| on_timeout),
        None => Ok(fut.await),
    }
}
