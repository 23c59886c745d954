use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::server::DEFAULT_MEDIA_PORT;
use crate::signaling::{DEFAULT_SIGNALING_ADDR, DEFAULT_SIGNALING_PATH, HandshakeOptions};
use crate::transport::CodecSpec;

/// Relay one UDP media stream (RTP) to any number of WebRTC peers
#[derive(Debug, Clone, Parser)]
#[command(name = "ffrtc")]
pub struct Config {
    /// Codec string (MIME type for the browser)
    #[arg(long, default_value = CodecSpec::DEFAULT_MIME_TYPE)]
    pub codec: String,

    /// WebSocket signaling address
    #[arg(long = "webso", default_value = DEFAULT_SIGNALING_ADDR)]
    pub signaling_addr: String,

    /// HTTP path upgraded to the signaling WebSocket
    #[arg(long, default_value = DEFAULT_SIGNALING_PATH)]
    pub path: String,

    /// UDP IP (RTP receive)
    #[arg(long = "ip", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub media_ip: IpAddr,

    /// UDP port (RTP receive)
    #[arg(long = "port", default_value_t = DEFAULT_MEDIA_PORT)]
    pub media_port: u16,

    /// STUN/TURN server URL, may be repeated
    #[arg(long = "ice-server")]
    pub ice_servers: Vec<String>,

    /// Seconds to wait for the offer before dropping the connection
    #[arg(long, value_parser = parse_seconds)]
    pub offer_timeout: Option<Duration>,

    /// Seconds to wait for candidate gathering before dropping the connection
    #[arg(long, value_parser = parse_seconds)]
    pub gathering_timeout: Option<Duration>,
}

impl Config {
    pub fn media_addr(&self) -> SocketAddr {
        SocketAddr::new(self.media_ip, self.media_port)
    }

    pub fn codec(&self) -> CodecSpec {
        CodecSpec::new(self.codec.clone())
    }

    pub fn handshake_options(&self) -> HandshakeOptions {
        HandshakeOptions {
            offer_timeout: self.offer_timeout,
            gathering_timeout: self.gathering_timeout,
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be positive, got {}", value));
    }
    Ok(Duration::from_secs_f64(secs))
}
