use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::session::{BroadcastReport, SessionRegistry};

pub const DEFAULT_MEDIA_PORT: u16 = 10004;

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// Ingestion counters (atomic, lock-free)
#[derive(Debug, Default)]
pub struct MediaStats {
    pub packets_received: AtomicU64,
    pub bytes_received: AtomicU64,
    pub packets_delivered: AtomicU64,
    pub sessions_dropped: AtomicU64,
}

/// Plain copy of [`MediaStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaStatsSnapshot {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub packets_delivered: u64,
    pub sessions_dropped: u64,
}

impl MediaStats {
    fn record(&self, len: usize, report: &BroadcastReport) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
        self.packets_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.sessions_dropped
            .fetch_add(report.removed.len() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MediaStatsSnapshot {
        MediaStatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            packets_delivered: self.packets_delivered.load(Ordering::Relaxed),
            sessions_dropped: self.sessions_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Media ingestion server: one UDP socket whose datagrams fan out to the
/// active sessions
pub struct MediaServer {
    socket: UdpSocket,
    registry: Arc<SessionRegistry>,
    stats: Arc<MediaStats>,
}

impl MediaServer {
    /// create and bind the media socket
    pub async fn bind(addr: SocketAddr, registry: Arc<SessionRegistry>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Media server listening on udp://{}", socket.local_addr()?);

        Ok(Self {
            socket,
            registry,
            stats: Arc::new(MediaStats::default()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> Arc<MediaStats> {
        self.stats.clone()
    }

    /// run the ingestion loop; returns only on a socket read error
    pub async fn run(self) -> std::io::Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, source) = self.socket.recv_from(&mut buf).await?;

            let report = self.registry.broadcast(&buf[..len]).await;
            debug!(
                "Packet of {} bytes from {} delivered to {} session(s)",
                len, source, report.delivered
            );
            self.stats.record(len, &report);
        }
    }
}
