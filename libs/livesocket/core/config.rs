use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Environment variable overriding the configured host
pub const HOST_ENV_VAR: &str = "LIVESOCKET_HOST";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] SocketError),
}

/// Serializable connection settings
///
/// This is the shape of the YAML config file and the input to
/// [`SocketConfig::validate`]. Durations are plain milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// `ws` or `wss`
    pub scheme: String,
    /// Host with optional port, e.g. `stream.example.com:443`
    pub host: String,
    #[serde(default)]
    pub path: String,

    /// Interval between pings; 0 disables pinging
    #[serde(default)]
    pub ping_interval_ms: u64,
    #[serde(default)]
    pub ping_message: String,
    /// Exact pong payload; frames equal to it never reach `read`
    ///
    /// An empty payload still swallows empty frames, but arms no pong deadline.
    #[serde(default)]
    pub pong_message: String,
    /// Time allowed for a pong after a ping; defaults to 3x the ping interval
    #[serde(default)]
    pub pong_deadline_ms: Option<u64>,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Dial attempts allowed between two successful connections; None = unlimited
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<usize>,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Extra wait after a disconnect, before the backoff delay
    #[serde(default)]
    pub reconnection_delay_offset_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Text frames sent after every successful dial
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_max_retries() -> Option<usize> {
    Some(10)
}

fn default_jitter() -> bool {
    true
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

impl SocketConfig {
    /// Minimal config for a target; every other field takes its default
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            ping_interval_ms: 0,
            ping_message: String::new(),
            pong_message: String::new(),
            pong_deadline_ms: None,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_retries: default_max_retries(),
            jitter: default_jitter(),
            reconnection_delay_offset_ms: 0,
            write_timeout_ms: default_write_timeout_ms(),
            subscriptions: Vec::new(),
        }
    }

    /// Load configuration from a YAML file
    ///
    /// `LIVESOCKET_HOST` overrides the host when set.
    pub fn load(config_path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: SocketConfig = serde_yaml::from_str(&yaml_content)?;

        if let Ok(host) = std::env::var(HOST_ENV_VAR) {
            info!("Overriding host from environment variable");
            config.host = host;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        build_url(&self.scheme, &self.host, &self.path)?;

        if self.ping_interval_ms > 0 && self.ping_message.is_empty() {
            return Err(SocketError::Configuration(
                "ping_message must be set when ping_interval_ms > 0".to_string(),
            ));
        }
        if self.pong_deadline_ms == Some(0) {
            return Err(SocketError::Configuration(
                "pong_deadline_ms must be greater than 0".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(SocketError::Configuration(
                "write_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(SocketError::Configuration(
                "max_backoff_ms must be >= initial_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Target URL built from scheme, host and path
    pub fn url(&self) -> Result<String> {
        build_url(&self.scheme, &self.host, &self.path)
    }

    pub fn ping_config(&self) -> PingConfig {
        let pong: Arc<dyn PongDetector> = Arc::new(ExactPongDetector::new(self.pong_message.as_bytes()));

        let ping = PingConfig::new(
            Duration::from_millis(self.ping_interval_ms),
            Frame::Text(self.ping_message.clone()),
            Some(pong),
            self.pong_deadline_ms.map(Duration::from_millis),
        );
        if self.pong_message.is_empty() {
            ping.without_pong_deadline()
        } else {
            ping
        }
    }

    pub fn reconnect_strategy(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.max_retries,
        )
        .with_jitter(self.jitter)
    }
}

/// Build a websocket URL from its parts
pub fn build_url(scheme: &str, host: &str, path: &str) -> Result<String> {
    if scheme != "ws" && scheme != "wss" {
        return Err(SocketError::Configuration(format!(
            "unsupported scheme '{}', expected ws or wss",
            scheme
        )));
    }
    if host.is_empty() || host.contains(['/', '?', '#']) {
        return Err(SocketError::Configuration(format!("invalid host '{}'", host)));
    }

    let mut url = Url::parse(&format!("{}://{}", scheme, host))
        .map_err(|e| SocketError::Configuration(format!("invalid target: {}", e)))?;
    if url.host_str().is_none() {
        return Err(SocketError::Configuration(format!("invalid host '{}'", host)));
    }
    url.set_path(path);
    Ok(url.to_string())
}

/// Liveness settings, fixed for the lifetime of a client
#[derive(Clone)]
pub struct PingConfig {
    interval: Duration,
    ping: Frame,
    pong: Option<Arc<dyn PongDetector>>,
    pong_deadline: Option<Duration>,
    /// Whether a missing pong counts as a dead connection
    expects_pong: bool,
}

impl PingConfig {
    /// # Arguments
    /// * `interval` - ping period; zero disables pinging
    /// * `ping` - payload sent on every tick
    /// * `pong` - detector for replies; None disables pong filtering and deadlines
    /// * `pong_deadline` - explicit deadline; defaults to 3x `interval`
    pub fn new(
        interval: Duration,
        ping: Frame,
        pong: Option<Arc<dyn PongDetector>>,
        pong_deadline: Option<Duration>,
    ) -> Self {
        let expects_pong = pong.is_some();
        Self {
            interval,
            ping,
            pong,
            pong_deadline,
            expects_pong,
        }
    }

    /// Keep filtering pongs, but never fail a connection for a missing one
    pub fn without_pong_deadline(mut self) -> Self {
        self.expects_pong = false;
        self
    }

    /// Pinging and pong filtering both disabled
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Frame::Text(String::new()), None, None)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn ping(&self) -> &Frame {
        &self.ping
    }

    pub fn pinging_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Deadline for a pong after a ping; None when no pong is expected
    pub fn pong_deadline(&self) -> Option<Duration> {
        if !self.expects_pong || self.pong.is_none() {
            return None;
        }
        match self.pong_deadline {
            Some(deadline) => Some(deadline),
            None if self.pinging_enabled() => Some(self.interval * 3),
            None => None,
        }
    }

    pub fn is_pong(&self, frame: &Frame) -> bool {
        self.pong.as_ref().map_or(false, |d| d.is_pong(frame))
    }
}

impl std::fmt::Debug for PingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingConfig")
            .field("interval", &self.interval)
            .field("ping", &self.ping)
            .field("has_pong_detector", &self.pong.is_some())
            .field("expects_pong", &self.expects_pong)
            .field("pong_deadline", &self.pong_deadline())
            .finish()
    }
}

/// Runtime configuration for a [`SocketClient`](crate::client::SocketClient)
///
/// Built by the type-state builder; immutable once the client starts.
pub struct ClientConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Liveness settings
    pub(crate) ping: PingConfig,

    /// Delay to wait after disconnection before the strategy delay
    pub(crate) reconnection_delay_offset: Duration,

    /// Upper bound for one frame write
    pub(crate) write_timeout: Duration,

    /// Frames sent after every successful dial
    pub(crate) subscriptions: Vec<Frame>,
}

impl ClientConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ping(&self) -> &PingConfig {
        &self.ping
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }
}
