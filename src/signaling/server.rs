use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{error, info, warn};

use super::handler::SignalingHandler;
use super::types::SignalingError;

pub const DEFAULT_SIGNALING_ADDR: &str = "127.0.0.1:8081";
pub const DEFAULT_SIGNALING_PATH: &str = "/ffrtc";

pub struct SignalingServer {
    listener: TcpListener,
    path: Arc<str>,
    handler: Arc<SignalingHandler>,
}

impl SignalingServer {
    /// bind the signaling endpoint; only `path` is upgraded to a WebSocket
    pub async fn bind(
        addr: &str,
        path: &str,
        handler: Arc<SignalingHandler>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Signaling server listening on ws://{}{}",
            listener.local_addr()?,
            path
        );

        Ok(Self {
            listener,
            path: Arc::from(path),
            handler,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handler = self.handler.clone();
            let path = self.path.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, &path, &handler).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    path: &str,
    handler: &SignalingHandler,
) -> Result<(), SignalingError> {
    info!("HTTP request from {}", addr);

    let check_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == path {
            Ok(resp)
        } else {
            warn!("Rejecting {} from {}: unknown path", req.uri().path(), addr);
            let mut not_found = ErrorResponse::new(Some("not found".to_string()));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Err(not_found)
        }
    };
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;

    let id = handler.handle(ws_stream, addr).await?;
    info!("Session {} negotiated with {}", id, addr);
    Ok(())
}
