//! Transport abstraction
//!
//! The runtime never touches websocket framing itself. It talks to an
//! established, already-framed bidirectional channel through [`Transport`]
//! and obtains new channels through a [`Dialer`].
//!
//! # Contract
//!
//! - `read_frame` is only ever called by one task at a time per transport.
//! - `write_frame` is only ever called by one task at a time per transport
//!   (the dispatcher holds an exclusive write lock), but it may run
//!   concurrently with `read_frame`.
//! - After the peer goes away every call returns an error.

use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;
use std::sync::Arc;

/// An established, framed bidirectional message channel
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one application frame
    async fn write_frame(&self, frame: Frame) -> Result<()>;

    /// Receive the next application frame
    ///
    /// Returns `Err(SocketError::Transport)` once the connection is gone.
    async fn read_frame(&self) -> Result<Frame>;

    /// Close the channel. Must be safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Factory for transports
///
/// Called by the supervisor on every connection attempt, including
/// reconnections.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Open a new transport to `url`
    ///
    /// Failures should be reported as `SocketError::Dial` so the supervisor
    /// retries them.
    async fn dial(&self, url: &str) -> Result<Arc<dyn Transport>>;
}
