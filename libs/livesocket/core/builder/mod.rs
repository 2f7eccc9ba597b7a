pub mod states;

use crate::client::SocketClient;
use crate::config::{build_url, ClientConfig, PingConfig, SocketConfig};
use crate::events::Hooks;
use crate::traits::*;
use crate::tungstenite::TungsteniteDialer;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

enum Target {
    Parts {
        scheme: String,
        host: String,
        path: String,
    },
    Url(String),
}

/// Everything except the target; moved unchanged across state transitions
struct Options {
    ping_interval: Duration,
    ping_message: Frame,
    pong_detector: Option<Arc<dyn PongDetector>>,
    pong_deadline: Option<Duration>,
    expects_pong: bool,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    reconnection_delay_offset: Duration,
    write_timeout: Duration,
    subscriptions: Vec<Frame>,
    dialer: Option<Arc<dyn Dialer>>,
    headers: Option<Arc<dyn HeaderProvider>>,
    hooks: Hooks,
}

/// Type-state builder for [`SocketClient`]
///
/// `connect()` is only available once a target (scheme/host/path or a full
/// URL) has been set.
///
/// # Example
/// ```ignore
/// let client = livesocket::builder()
///     .target("wss", "stream.example.com", "/ws")
///     .ping(Duration::from_secs(15), r#"{"op":"ping"}"#)
///     .pong(r#"{"type":"pong"}"#)
///     .reconnect_strategy(ExponentialBackoff::new(
///         Duration::from_secs(1),
///         Duration::from_secs(30),
///         Some(5),
///     ))
///     .on_connected(|generation| tracing::info!("generation {} up", generation))
///     .connect()
///     .await?;
/// ```
pub struct SocketClientBuilder<T: TargetState> {
    _state: PhantomData<T>,
    target: Option<Target>,
    options: Options,
}

impl SocketClientBuilder<NoTarget> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            target: None,
            options: Options {
                ping_interval: Duration::ZERO,
                ping_message: Frame::Text(String::new()),
                pong_detector: None,
                pong_deadline: None,
                expects_pong: false,
                reconnect_strategy: None,
                reconnection_delay_offset: Duration::ZERO,
                write_timeout: DEFAULT_WRITE_TIMEOUT,
                subscriptions: Vec::new(),
                dialer: None,
                headers: None,
                hooks: Hooks::default(),
            },
        }
    }

    /// Dial `scheme://host/path`
    pub fn target(
        self,
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> SocketClientBuilder<HasTarget> {
        SocketClientBuilder {
            _state: PhantomData,
            target: Some(Target::Parts {
                scheme: scheme.into(),
                host: host.into(),
                path: path.into(),
            }),
            options: self.options,
        }
    }

    /// Dial a full `ws://` or `wss://` URL
    pub fn url(self, url: impl Into<String>) -> SocketClientBuilder<HasTarget> {
        SocketClientBuilder {
            _state: PhantomData,
            target: Some(Target::Url(url.into())),
            options: self.options,
        }
    }

    /// Builder preloaded from a validated [`SocketConfig`]
    pub fn from_config(config: &SocketConfig) -> Result<SocketClientBuilder<HasTarget>> {
        config.validate()?;
        let ping = config.ping_config();

        let mut builder = Self::new()
            .target(config.scheme.clone(), config.host.clone(), config.path.clone())
            .ping(ping.interval(), ping.ping().clone())
            .pong(config.pong_message.clone())
            .reconnect_strategy(config.reconnect_strategy())
            .reconnection_delay_offset(Duration::from_millis(config.reconnection_delay_offset_ms))
            .write_timeout(Duration::from_millis(config.write_timeout_ms))
            .subscriptions(config.subscriptions.iter().map(|s| Frame::Text(s.clone())).collect());

        if let Some(deadline) = config.pong_deadline_ms {
            builder = builder.pong_deadline(Duration::from_millis(deadline));
        }
        Ok(builder)
    }
}

impl Default for SocketClientBuilder<NoTarget> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<T: TargetState> SocketClientBuilder<T> {
    /// Send `payload` every `interval`; a zero interval disables pinging
    pub fn ping(mut self, interval: Duration, payload: impl Into<Frame>) -> Self {
        self.options.ping_interval = interval;
        self.options.ping_message = payload.into();
        self
    }

    /// Treat frames whose bytes equal `payload` exactly as pongs
    ///
    /// An empty payload swallows empty frames but arms no pong deadline.
    pub fn pong(mut self, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        self.options.expects_pong = !payload.is_empty();
        self.options.pong_detector = Some(Arc::new(ExactPongDetector::new(payload)));
        self
    }

    /// Custom pong recognition
    pub fn pong_detector(mut self, detector: Arc<dyn PongDetector>) -> Self {
        self.options.expects_pong = true;
        self.options.pong_detector = Some(detector);
        self
    }

    /// How long to wait for a pong after a ping before forcing a reconnect
    ///
    /// Must be non-zero. Defaults to 3x the ping interval. Has no effect
    /// without a non-empty pong payload or a custom detector.
    pub fn pong_deadline(mut self, deadline: Duration) -> Self {
        self.options.pong_deadline = Some(deadline);
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.options.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Set the delay offset to wait after disconnection before reconnection
    ///
    /// This delay is applied BEFORE the reconnection strategy's delay.
    pub fn reconnection_delay_offset(mut self, offset: Duration) -> Self {
        self.options.reconnection_delay_offset = offset;
        self
    }

    /// Upper bound for a single frame write
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.options.write_timeout = timeout;
        self
    }

    /// Frame sent after every successful dial, before the connection is announced
    pub fn subscription(mut self, frame: impl Into<Frame>) -> Self {
        self.options.subscriptions.push(frame.into());
        self
    }

    pub fn subscriptions(mut self, frames: Vec<Frame>) -> Self {
        self.options.subscriptions.extend(frames);
        self
    }

    /// Replace the default `tokio-tungstenite` dialer
    pub fn dialer(mut self, dialer: impl Dialer) -> Self {
        self.options.dialer = Some(Arc::new(dialer));
        self
    }

    /// Handshake headers for the default dialer
    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.options.headers = Some(Arc::new(provider));
        self
    }

    /// Called with the generation number every time a connection comes up
    pub fn on_connected(mut self, hook: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.options.hooks.connected.push(Arc::new(hook));
        self
    }

    /// Called on every failed dial (generation None) and every lost generation
    pub fn on_disconnected(
        mut self,
        hook: impl Fn(Option<u64>, &str) + Send + Sync + 'static,
    ) -> Self {
        self.options.hooks.disconnected.push(Arc::new(hook));
        self
    }
}

// Connect - only available once the target is set
impl SocketClientBuilder<HasTarget> {
    /// Start the client and wait for the first connection
    ///
    /// # Errors
    /// * `SocketError::Configuration` - invalid target or ping settings
    /// * `SocketError::ConnectionLost` - retry budget exhausted before the first connection
    pub async fn connect(self) -> Result<SocketClient> {
        let url = match self.target {
            Some(Target::Parts { scheme, host, path }) => build_url(&scheme, &host, &path)?,
            Some(Target::Url(url)) => url,
            None => {
                return Err(SocketError::Configuration("target must be set".to_string()));
            }
        };
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(SocketError::Configuration(format!(
                "unsupported URL '{}', expected ws:// or wss://",
                url
            )));
        }

        let options = self.options;
        if !options.ping_interval.is_zero() && options.ping_message.is_empty() {
            return Err(SocketError::Configuration(
                "ping message must not be empty when pinging is enabled".to_string(),
            ));
        }
        if options.pong_deadline == Some(Duration::ZERO) {
            return Err(SocketError::Configuration(
                "pong deadline must be greater than zero".to_string(),
            ));
        }
        if options.write_timeout.is_zero() {
            return Err(SocketError::Configuration(
                "write timeout must be greater than zero".to_string(),
            ));
        }

        let reconnect_strategy: Box<dyn ReconnectionStrategy> = match options.reconnect_strategy {
            Some(strategy) => strategy,
            None => Box::new(
                ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), Some(10))
                    .with_jitter(true),
            ),
        };

        let dialer: Arc<dyn Dialer> = match options.dialer {
            Some(dialer) => dialer,
            None => {
                let mut dialer = TungsteniteDialer::new();
                if let Some(headers) = options.headers {
                    dialer = dialer.with_headers(headers);
                }
                Arc::new(dialer)
            }
        };

        let mut ping = PingConfig::new(
            options.ping_interval,
            options.ping_message,
            options.pong_detector,
            options.pong_deadline,
        );
        if !options.expects_pong {
            ping = ping.without_pong_deadline();
        }

        let config = ClientConfig {
            url,
            ping,
            reconnection_delay_offset: options.reconnection_delay_offset,
            write_timeout: options.write_timeout,
            subscriptions: options.subscriptions,
        };

        SocketClient::start(config, dialer, reconnect_strategy, options.hooks).await
    }
}
