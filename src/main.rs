use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use ffrtc::config::Config;
use ffrtc::server::MediaServer;
use ffrtc::session::SessionRegistry;
use ffrtc::signaling::{SignalingHandler, SignalingServer};
use ffrtc::transport::WebRtcTransport;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    info!(
        "arguments: [{}] udp://{} -> ws://{}{}",
        config.codec,
        config.media_addr(),
        config.signaling_addr,
        config.path
    );

    let transport = WebRtcTransport::new(&config.ice_servers).map_err(std::io::Error::other)?;

    let registry = Arc::new(SessionRegistry::new());
    registry.spawn_reaper();

    let handler = Arc::new(SignalingHandler::new(
        Arc::clone(&registry),
        Arc::new(transport),
        config.codec(),
        config.handshake_options(),
    ));
    let signaling = SignalingServer::bind(&config.signaling_addr, &config.path, handler).await?;
    tokio::spawn(async move {
        if let Err(e) = signaling.run().await {
            error!("Signaling server stopped: {}", e);
        }
    });

    let media = MediaServer::bind(config.media_addr(), registry).await?;

    tokio::select! {
        result = media.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
