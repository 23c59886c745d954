use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use futures_util::future::BoxFuture;

use ffrtc::session::SessionRegistry;
use ffrtc::signaling::SessionDescription;
use ffrtc::transport::{
    CodecSpec, ConnectivityHandler, MediaSink, OutboundTrack, PeerHandle, TransportError,
};

/// sink that accepts and drops every packet
struct NullSink;

#[async_trait]
impl MediaSink for NullSink {
    async fn write(&self, packet: &[u8]) -> Result<(), TransportError> {
        black_box(packet);
        Ok(())
    }
}

/// peer that is never negotiated; only its ownership matters here
struct NullPeer;

#[async_trait]
impl PeerHandle for NullPeer {
    async fn add_outbound_track(&self, _codec: &CodecSpec) -> Result<OutboundTrack, TransportError> {
        Err(TransportError::Closed)
    }

    fn on_connectivity_change(&self, _handler: ConnectivityHandler) {}

    async fn gathering_complete(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    async fn set_remote_offer(&self, _offer: SessionDescription) -> Result<(), TransportError> {
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        Ok(SessionDescription::answer("v=0"))
    }

    async fn set_local_answer(&self, _answer: SessionDescription) -> Result<(), TransportError> {
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        None
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// registry with `sessions` active sinks
fn populated_registry(rt: &tokio::runtime::Runtime, sessions: usize) -> SessionRegistry {
    let registry = SessionRegistry::new();
    rt.block_on(async {
        for _ in 0..sessions {
            let ticket = registry.reserve().await;
            let peer: Arc<dyn PeerHandle> = Arc::new(NullPeer);
            registry.attach(ticket, Arc::clone(&peer)).await;
            registry.publish(ticket, peer, Arc::new(NullSink)).await;
        }
    });
    registry
}

/// fan-out pass benchmark
fn bench_broadcast(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let packet = [0x80u8; 1200];

    let mut group = c.benchmark_group("Broadcast");
    group.throughput(Throughput::Elements(1));

    for sessions in [1usize, 16, 256] {
        let registry = populated_registry(&rt, sessions);
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &sessions, |b, _| {
            b.iter(|| {
                let report = rt.block_on(registry.broadcast(black_box(&packet)));
                black_box(report)
            })
        });
    }

    group.finish();
}

/// offer decoding benchmark
fn bench_offer_decode(c: &mut Criterion) {
    let sdp = "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
               a=group:BUNDLE 0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\nc=IN IP4 0.0.0.0\r\n\
               a=rtpmap:96 VP8/90000\r\na=recvonly\r\n";
    let offer = format!(
        r#"{{"type":"offer","sdp":{}}}"#,
        serde_json::to_string(sdp).unwrap()
    );

    let mut group = c.benchmark_group("Signaling");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_offer", |b| {
        b.iter(|| {
            let desc = SessionDescription::parse_offer(black_box(&offer)).unwrap();
            black_box(desc)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_broadcast, bench_offer_decode);
criterion_main!(benches);
