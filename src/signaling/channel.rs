use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use super::types::SignalingError;

/// Bidirectional text channel carrying one offer and one answer
#[async_trait]
pub trait SignalingChannel: Send {
    /// read the next text message; `None` once the peer closed the channel
    async fn recv_text(&mut self) -> Result<Option<String>, SignalingError>;

    async fn send_text(&mut self, text: String) -> Result<(), SignalingError>;

    async fn close(&mut self);
}

#[async_trait]
impl<S> SignalingChannel for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_text(&mut self) -> Result<Option<String>, SignalingError> {
        while let Some(msg) = self.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    return Ok(Some(text));
                }
                Message::Close(_) => return Ok(None),
                other => debug!("Skipping {} byte control frame", other.len()),
            }
        }
        Ok(None)
    }

    async fn send_text(&mut self, text: String) -> Result<(), SignalingError> {
        self.send(Message::text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = SinkExt::close(self).await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}
