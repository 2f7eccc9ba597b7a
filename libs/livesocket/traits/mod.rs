//! # livesocket traits
//!
//! Core traits and types shared by every livesocket component:
//!
//! - **Transport / Dialer**: the framed channel the runtime drives
//! - **PongDetector**: recognize liveness replies in the inbound stream
//! - **ReconnectionStrategy**: control the delay between dial attempts
//! - **HeaderProvider**: per-dial handshake headers

pub mod error;
pub mod frame;
pub mod headers;
pub mod pong_detector;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use frame::Frame;
pub use headers::{HeaderProvider, Headers, NoHeaders, StaticHeaders};
pub use pong_detector::{ExactPongDetector, PongDetector};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
pub use transport::{Dialer, Transport};
