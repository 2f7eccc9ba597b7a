//! Common test utilities for livesocket integration tests
//!
//! Two kinds of peers:
//! - [`MockWsServer`]: a real `tokio-tungstenite` server on localhost
//! - [`ScriptedDialer`]: in-memory transports with scripted dial failures

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use livesocket::{Dialer, Frame, Result, SocketError, Transport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{broadcast, Notify};
use tokio_tungstenite::tungstenite::Message;

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

#[derive(Default)]
struct ServerStats {
    connections: AtomicUsize,
    pings: AtomicUsize,
    received: Mutex<Vec<String>>,
}

/// A mock websocket server for testing
///
/// Echoes text and binary frames. A text frame equal to the configured ping
/// is answered with the configured pong instead of being echoed.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    kick: Arc<Notify>,
    push: broadcast::Sender<Message>,
    stats: Arc<ServerStats>,
}

impl MockWsServer {
    /// Echo server answering `"ping"` with `"pong"`
    pub async fn start() -> Self {
        Self::start_with(Some(("ping", "pong"))).await
    }

    /// Echo server that never answers pings (they are counted, not echoed)
    pub async fn start_silent() -> Self {
        Self::start_with(None).await
    }

    async fn start_with(ping_reply: Option<(&str, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let kick = Arc::new(Notify::new());
        let (push, _) = broadcast::channel(64);
        let stats = Arc::new(ServerStats::default());
        let ping_reply = ping_reply.map(|(ping, pong)| (ping.to_string(), pong.to_string()));

        let accept_shutdown = Arc::clone(&shutdown);
        let accept_kick = Arc::clone(&kick);
        let accept_push = push.clone();
        let accept_stats = Arc::clone(&stats);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                accept_stats.connections.fetch_add(1, Ordering::SeqCst);
                                tokio::spawn(Self::handle_connection(
                                    stream,
                                    Arc::clone(&accept_shutdown),
                                    Arc::clone(&accept_kick),
                                    accept_push.subscribe(),
                                    Arc::clone(&accept_stats),
                                    ping_reply.clone(),
                                ));
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = accept_shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            kick,
            push,
            stats,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        shutdown: Arc<Notify>,
        kick: Arc<Notify>,
        mut push: broadcast::Receiver<Message>,
        stats: Arc<ServerStats>,
        ping_reply: Option<(String, String)>,
    ) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(_)) | None => break,
                    };
                    match msg {
                        Message::Text(text) => {
                            let reply = match ping_reply {
                                Some((ref ping, ref pong)) if text == *ping => {
                                    stats.pings.fetch_add(1, Ordering::SeqCst);
                                    Some(Message::Text(pong.clone()))
                                }
                                None if text == "ping" => {
                                    stats.pings.fetch_add(1, Ordering::SeqCst);
                                    None
                                }
                                _ => {
                                    stats.received.lock().push(text.clone());
                                    Some(Message::Text(text))
                                }
                            };
                            if let Some(reply) = reply {
                                if write.send(reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Message::Binary(data) => {
                            if write.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                pushed = push.recv() => {
                    match pushed {
                        Ok(msg) => {
                            if write.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                // Drop the TCP connection without a close handshake
                _ = kick.notified() => return,
                _ = shutdown.notified() => break,
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// `host:port` for `SocketClient::connect`
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Send a text frame to every connected client
    pub fn push_text(&self, text: &str) {
        let _ = self.push.send(Message::Text(text.to_string()));
    }

    /// Abruptly drop every open connection; the listener keeps accepting
    pub fn drop_connections(&self) {
        self.kick.notify_waiters();
    }

    pub fn connections(&self) -> usize {
        self.stats.connections.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.stats.pings.load(Ordering::SeqCst)
    }

    /// Non-ping text frames received, in order
    pub fn received(&self) -> Vec<String> {
        self.stats.received.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Address with nothing listening on it
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// In-memory transport driven by the test
pub struct MemoryTransport {
    written: Mutex<Vec<Frame>>,
    inbound_tx: UnboundedSender<Result<Frame>>,
    inbound_rx: tokio::sync::Mutex<UnboundedReceiver<Result<Frame>>>,
    closed: AtomicBool,
    /// (ping, pong): writing `ping` makes `pong` readable
    auto_pong: Option<(Frame, Frame)>,
}

impl MemoryTransport {
    fn new(auto_pong: Option<(Frame, Frame)>) -> Self {
        let (inbound_tx, inbound_rx) = unbounded_channel();
        Self {
            written: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            closed: AtomicBool::new(false),
            auto_pong,
        }
    }

    /// Make `frame` readable by the client
    pub fn push(&self, frame: impl Into<Frame>) {
        let _ = self.inbound_tx.send(Ok(frame.into()));
    }

    /// Break the connection: the pending read fails
    pub fn fail(&self) {
        let _ = self
            .inbound_tx
            .send(Err(SocketError::Transport("injected failure".to_string())));
    }

    pub fn written(&self) -> Vec<Frame> {
        self.written.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write_frame(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(SocketError::Transport("write on closed transport".to_string()));
        }
        if let Some((ref ping, ref pong)) = self.auto_pong {
            if frame == *ping {
                let _ = self.inbound_tx.send(Ok(pong.clone()));
            }
        }
        self.written.lock().push(frame);
        Ok(())
    }

    async fn read_frame(&self) -> Result<Frame> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some(result) => result,
            None => Err(SocketError::Transport("stream ended".to_string())),
        }
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self
                .inbound_tx
                .send(Err(SocketError::Transport("closed locally".to_string())));
        }
        Ok(())
    }
}

#[derive(Default)]
struct DialerState {
    /// Outcomes for upcoming dials; empty means succeed
    script: Mutex<VecDeque<bool>>,
    fail_all: AtomicBool,
    dials: AtomicUsize,
    transports: Mutex<Vec<Arc<MemoryTransport>>>,
    auto_pong: Mutex<Option<(Frame, Frame)>>,
}

/// Dialer handing out [`MemoryTransport`]s, with scripted failures
///
/// Clones share state, so the test keeps one handle and gives another to the
/// client builder.
#[derive(Clone, Default)]
pub struct ScriptedDialer {
    state: Arc<DialerState>,
}

impl ScriptedDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` dials fail, later ones succeed
    pub fn failing(n: usize) -> Self {
        let dialer = Self::new();
        dialer.fail_next(n);
        dialer
    }

    pub fn fail_next(&self, n: usize) {
        self.state.script.lock().extend(std::iter::repeat(false).take(n));
    }

    /// Every dial fails until switched off again
    pub fn set_fail_all(&self, fail: bool) {
        self.state.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Transports created from now on answer `ping` with `pong`
    pub fn with_auto_pong(self, ping: &str, pong: &str) -> Self {
        *self.state.auto_pong.lock() = Some((Frame::from(ping), Frame::from(pong)));
        self
    }

    pub fn dials(&self) -> usize {
        self.state.dials.load(Ordering::SeqCst)
    }

    /// Transport of the n-th successful dial (0-based)
    pub fn transport(&self, index: usize) -> Arc<MemoryTransport> {
        Arc::clone(&self.state.transports.lock()[index])
    }

    pub fn transport_count(&self) -> usize {
        self.state.transports.lock().len()
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(&self, url: &str) -> Result<Arc<dyn Transport>> {
        let dial = self.state.dials.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.state.script.lock().pop_front();
        if self.state.fail_all.load(Ordering::SeqCst) || scripted == Some(false) {
            return Err(SocketError::Dial(format!("scripted failure #{} for {}", dial, url)));
        }

        let transport = Arc::new(MemoryTransport::new(self.state.auto_pong.lock().clone()));
        self.state.transports.lock().push(Arc::clone(&transport));
        Ok(transport)
    }
}
