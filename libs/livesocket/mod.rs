//! # livesocket
//!
//! A websocket client that stays connected: reconnects with backoff and
//! jitter, detects dead connections with an application-level ping/pong,
//! serializes concurrent writes and keeps pongs out of the read path.
//!
//! ## Features
//!
//! - **Generations**: every physical connection gets a number; work tagged with
//!   a superseded generation fails fast instead of touching a dead socket
//! - **Type-state builder**: `connect()` only exists once a target is set
//! - **Pluggable**: custom dialers, transports, pong detectors, reconnection
//!   strategies and handshake headers

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, events, pong_tracker, tungstenite,
    builder::{states, SocketClientBuilder},
    client::{Metrics, SocketClient},
    config::{build_url, ClientConfig, ConfigError, PingConfig, SocketConfig},
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    events::{ClientEvent, ConnectedHook, DisconnectedHook},
    pong_tracker::PongTracker,
    tungstenite::{TungsteniteDialer, TungsteniteTransport},
};
pub(crate) use self::core::{dispatcher, heartbeat, shared, supervisor};
