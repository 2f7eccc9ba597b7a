//! # livesocket core
//!
//! The runtime behind [`SocketClient`]: a supervisor that dials and replaces
//! connections, a dispatcher that serializes writes and runs one read loop per
//! connection, and a heartbeat that pings and enforces the pong deadline.
//!
//! ## Example
//!
//! ```rust,ignore
//! use livesocket::SocketClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> livesocket::Result<()> {
//!     let client = SocketClient::connect(
//!         "wss",
//!         "stream.example.com",
//!         "/ws",
//!         Duration::from_secs(15),
//!         "ping",
//!         "pong",
//!     )
//!     .await?;
//!
//!     client.send_json(&serde_json::json!({"op": "subscribe", "channel": "trades"})).await?;
//!
//!     while let Ok(frame) = client.read().await {
//!         println!("{:?}", frame);
//!     }
//!
//!     client.close().await
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub(crate) mod dispatcher;
pub mod events;
pub(crate) mod heartbeat;
pub mod pong_tracker;
pub(crate) mod shared;
pub(crate) mod supervisor;
pub mod tungstenite;

// Re-export main types
pub use builder::{states, SocketClientBuilder};
pub use client::{Metrics, SocketClient};
pub use config::{build_url, ClientConfig, ConfigError, PingConfig, SocketConfig};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use events::{ClientEvent, ConnectedHook, DisconnectedHook};
pub use pong_tracker::PongTracker;
pub use tungstenite::{TungsteniteDialer, TungsteniteTransport};

/// Create a new client builder
///
/// # Example
/// ```ignore
/// let client = livesocket::builder()
///     .url("wss://stream.example.com/ws")
///     .ping(Duration::from_secs(15), "ping")
///     .pong("pong")
///     .subscription(r#"{"op":"subscribe","channel":"trades"}"#)
///     .connect()
///     .await?;
/// ```
pub fn builder() -> SocketClientBuilder<states::NoTarget> {
    SocketClientBuilder::new()
}
