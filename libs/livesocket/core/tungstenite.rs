//! `tokio-tungstenite` implementation of [`Dialer`] and [`Transport`]

use crate::traits::*;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials websocket servers with `tokio-tungstenite`
pub struct TungsteniteDialer {
    headers: Option<Arc<dyn HeaderProvider>>,
    connect_timeout: Duration,
}

impl TungsteniteDialer {
    pub fn new() -> Self {
        Self {
            headers: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Headers generated on every dial
    pub fn with_headers(mut self, provider: Arc<dyn HeaderProvider>) -> Self {
        self.headers = Some(provider);
        self
    }

    /// Upper bound for TCP connect + TLS + handshake
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TungsteniteDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for TungsteniteDialer {
    async fn dial(&self, url: &str) -> Result<Arc<dyn Transport>> {
        let mut request = url
            .into_client_request()
            .map_err(|e| SocketError::Dial(format!("invalid request for {}: {}", url, e)))?;

        if let Some(ref provider) = self.headers {
            for (key, value) in provider.get_headers().await {
                match (
                    key.parse::<http::header::HeaderName>(),
                    value.parse::<http::header::HeaderValue>(),
                ) {
                    (Ok(name), Ok(value)) => {
                        request.headers_mut().insert(name, value);
                    }
                    (Err(_), _) => warn!("Invalid header name: {}", key),
                    (_, Err(_)) => warn!("Invalid header value for key '{}'", key),
                }
            }
            debug!("Connecting with custom headers");
        }

        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| SocketError::Dial(format!("handshake timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| SocketError::Dial(e.to_string()))?;

        Ok(Arc::new(TungsteniteTransport::new(ws_stream)))
    }
}

/// An established `tokio-tungstenite` connection
///
/// The stream is split so a write never waits on a pending read.
pub struct TungsteniteTransport {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl TungsteniteTransport {
    pub fn new(ws_stream: WsStream) -> Self {
        let (sink, stream) = ws_stream.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn write_frame(&self, frame: Frame) -> Result<()> {
        self.sink
            .lock()
            .await
            .send(frame_to_tungstenite(frame))
            .await
            .map_err(|e| SocketError::Transport(e.to_string()))
    }

    async fn read_frame(&self) -> Result<Frame> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Close(close))) => {
                    let reason = close
                        .map(|c| format!("{} {}", c.code, c.reason))
                        .unwrap_or_else(|| "no close frame".to_string());
                    return Err(SocketError::Transport(format!("closed by peer: {}", reason)));
                }
                Some(Ok(msg)) => {
                    if let Some(frame) = tungstenite_to_frame(msg) {
                        return Ok(frame);
                    }
                    // Protocol ping/pong, answered by tungstenite itself
                }
                Some(Err(e)) => return Err(SocketError::Transport(e.to_string())),
                None => return Err(SocketError::Transport("stream ended".to_string())),
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if let Err(e) = self.sink.lock().await.close().await {
            debug!("Close handshake failed: {}", e);
        }
        Ok(())
    }
}

/// Convert Frame to tungstenite Message
fn frame_to_tungstenite(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
    }
}

/// Convert tungstenite Message to Frame
fn tungstenite_to_frame(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(data) => Some(Frame::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
