use crate::config::{ClientConfig, PingConfig};
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::dispatcher::Dispatcher;
use crate::events::{ClientEvent, EventBus, Hooks};
use crate::pong_tracker::PongTracker;
use crate::shared::Shared;
use crate::supervisor::spawn_supervisor;
use crate::traits::*;
use serde::Serialize;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub pongs_filtered: u64,
    pub pings_sent: u64,
    pub reconnect_count: u64,
    pub generation: u64,
    pub connection_state: ConnectionState,
}

/// Resilient websocket client
///
/// A `SocketClient` is one logical connection. Underneath, a supervisor task
/// dials, runs and replaces physical connections ("generations") as they
/// fail, so callers keep using the same handle across reconnects:
/// - Writes from any number of tasks are serialized against the current generation
/// - A single read loop per generation filters pongs and feeds [`read`](Self::read)
/// - A heartbeat per generation pings and forces a reconnect on a missed pong
///
/// Use [`SocketClient::connect`] for the common case or
/// [`livesocket::builder()`](crate::builder()) for everything else.
pub struct SocketClient {
    shared: Arc<Shared>,
    inbound_rx: Mutex<UnboundedReceiver<Frame>>,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SocketClient {
    /// Connect to `scheme://host/path` with the default reconnection policy
    ///
    /// A zero `ping_interval` disables pinging. Frames equal to
    /// `pong_message` never reach [`read`](Self::read), even when it is
    /// empty; an empty `pong_message` only means no pong deadline is armed.
    /// Blocks until the first connection is up or the initial retry budget
    /// is exhausted.
    pub async fn connect(
        scheme: &str,
        host: &str,
        path: &str,
        ping_interval: Duration,
        ping_message: &str,
        pong_message: &str,
    ) -> Result<Self> {
        crate::builder()
            .target(scheme, host, path)
            .ping(ping_interval, ping_message)
            .pong(pong_message)
            .connect()
            .await
    }

    /// Spawn the supervisor and wait for its first verdict
    pub(crate) async fn start(
        config: ClientConfig,
        dialer: Arc<dyn Dialer>,
        strategy: Box<dyn ReconnectionStrategy>,
        hooks: Hooks,
    ) -> Result<Self> {
        let (dispatcher, failures) = Dispatcher::new(config.write_timeout());
        let (inbound_tx, inbound_rx) = unbounded_channel();
        let pong_timeout = pong_timeout(config.ping());

        let shared = Arc::new(Shared {
            config,
            dispatcher,
            state: AtomicConnectionState::new(ConnectionState::Connecting),
            metrics: AtomicMetrics::new(),
            tracker: PongTracker::new(pong_timeout),
            events: EventBus::new(hooks),
            inbound_tx,
            shutdown: CancellationToken::new(),
            lost_after: AtomicUsize::new(0),
        });

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = spawn_supervisor(Arc::clone(&shared), dialer, strategy, failures, ready_tx);

        let client = Self {
            shared,
            inbound_rx: Mutex::new(inbound_rx),
            supervisor: parking_lot::Mutex::new(Some(handle)),
        };

        let verdict = ready_rx.await.unwrap_or(Err(SocketError::Closed));
        match verdict {
            Ok(generation) => {
                debug!("Client ready on generation {}", generation);
                Ok(client)
            }
            Err(e) => {
                client.close().await?;
                Err(e)
            }
        }
    }

    /// Send a text frame
    pub async fn send(&self, message: impl Into<String>) -> Result<()> {
        self.send_frame(Frame::Text(message.into())).await
    }

    /// Serialize `value` as JSON and send it as a text frame
    ///
    /// Serialization failures are returned as `SocketError::Encoding` and
    /// nothing is sent.
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.send_frame(Frame::Text(payload)).await
    }

    /// Send a text or binary frame on the current generation
    ///
    /// # Errors
    /// * `NotConnected` - no generation is active, or the active one failed during the write
    /// * `Closed` / `ConnectionLost` - the client is terminal
    pub async fn send_frame(&self, frame: Frame) -> Result<()> {
        if self.shared.state.is_terminal() {
            return Err(self.shared.terminal_error());
        }

        match self.shared.dispatcher.write(frame).await {
            Ok(_) => {
                self.shared.metrics.increment_sent();
                Ok(())
            }
            Err(_) if self.shared.state.is_terminal() => Err(self.shared.terminal_error()),
            Err(e) if e.is_recoverable() => {
                // Already reported to the supervisor, which will reconnect
                debug!("Write failed, generation is being replaced: {}", e);
                Err(SocketError::NotConnected)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for the next application frame
    ///
    /// Pongs never come out of here. Reconnects are invisible apart from the
    /// frames lost in between.
    ///
    /// Once the client is closed or lost this fails immediately, even if
    /// frames received before that are still queued; those are dropped.
    pub async fn read(&self) -> Result<Frame> {
        if self.shared.state.is_terminal() {
            return Err(self.shared.terminal_error());
        }

        let mut rx = self.inbound_rx.lock().await;
        tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => Err(self.shared.terminal_error()),
            frame = rx.recv() => frame.ok_or_else(|| self.shared.terminal_error()),
        }
    }

    /// Close the client
    ///
    /// Stops the supervisor, any pending dial or backoff, the heartbeat and
    /// the read loop, and closes the active transport. Pending and future
    /// `read`/`send` calls fail with `Closed`. Calling it again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let first = self.shared.state.advance(ConnectionState::Closed);
        self.shared.shutdown.cancel();

        let generation = self.shared.dispatcher.generation();
        self.shared.dispatcher.retire(generation).await;

        let handle = self.supervisor.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Supervisor task ended abnormally: {}", e);
            }
        }

        if first {
            info!("Client closed");
            self.shared.events.emit(ClientEvent::Closed);
        }
        Ok(())
    }

    /// Register a hook called with the generation on every connect
    ///
    /// Hooks run on the supervisor task and must not block. A hook may
    /// register more hooks; they take effect from the next event.
    pub fn on_connected(&self, hook: impl Fn(u64) + Send + Sync + 'static) {
        self.shared.events.on_connected(Arc::new(hook));
    }

    /// Register a hook called on every failed dial and every lost generation
    pub fn on_disconnected(&self, hook: impl Fn(Option<u64>, &str) + Send + Sync + 'static) {
        self.shared.events.on_disconnected(Arc::new(hook));
    }

    /// Try to receive a lifecycle event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.shared.events.receiver().try_recv().ok()
    }

    /// Receive a lifecycle event (blocking; call from a blocking context)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.shared.events.receiver().recv()
    }

    /// Receive a lifecycle event, giving up after `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.shared.events.receiver().recv_timeout(timeout).ok()
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    /// Latest generation (0 before the first connection)
    #[inline]
    pub fn generation(&self) -> u64 {
        self.shared.dispatcher.generation()
    }

    /// False once a ping has gone unanswered for longer than the pong deadline
    pub fn is_healthy(&self) -> bool {
        self.shared.tracker.is_healthy()
    }

    /// Target URL
    pub fn url(&self) -> &str {
        self.shared.config.url()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        let metrics = &self.shared.metrics;
        Metrics {
            frames_sent: metrics.frames_sent(),
            frames_received: metrics.frames_received(),
            pongs_filtered: metrics.pongs_filtered(),
            pings_sent: metrics.pings_sent(),
            reconnect_count: metrics.reconnect_count(),
            generation: self.shared.dispatcher.generation(),
            connection_state: self.shared.state.get(),
        }
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        // Background tasks hold their own Arc<Shared>; cancelling lets them wind down
        self.shared.shutdown.cancel();
    }
}

/// Without a pong deadline the tracker never reports unhealthy
fn pong_timeout(ping: &PingConfig) -> Duration {
    ping.pong_deadline().unwrap_or(Duration::MAX)
}

