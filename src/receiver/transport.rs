//! Connection seam between the driver and the network.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::TtyShareError;
use crate::Result;

/// One open duplex connection carrying text frames.
pub trait Link {
    /// Send one text frame.
    fn send(&mut self, text: String) -> impl Future<Output = Result<()>>;

    /// Wait for the next text frame. `None` means the connection closed,
    /// whatever the cause.
    ///
    /// Must be cancel-safe: the driver polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Option<String>>;

    /// Close the connection from this side.
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Opens [`Link`]s to a target address.
pub trait Transport {
    type Link: Link;

    fn connect(&mut self, target: &str) -> impl Future<Output = Result<Self::Link>>;
}

/// WebSocket transport built on tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
        }
    }

    /// Give up on a connection attempt after `timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    type Link = WsLink;

    async fn connect(&mut self, target: &str) -> Result<WsLink> {
        let (stream, response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(target))
                .await
                .map_err(|_| TtyShareError::WebSocket(format!("connect to {} timed out", target)))??;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsLink { stream })
    }
}

/// A client WebSocket connection.
pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Link for WsLink {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(text),
                    Err(_) => debug!("ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(reason))) => {
                    debug!(?reason, "server closed the connection");
                    return None;
                }
                Some(Ok(other)) => trace!("ignoring control frame: {:?}", other),
                Some(Err(e)) => {
                    debug!("WebSocket error: {}", e);
                    return None;
                }
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
