//! Write serialization and the per-generation read loop
//!
//! # Architecture
//!
//! ```text
//!  send() ──┐
//!  send() ──┼──> write lock ──> slot (generation, transport) ──> Transport::write_frame
//!  ping   ──┘        ▲
//!                    │ install / retire take the same lock
//!               Supervisor
//!
//!  Transport::read_frame ──> read_loop ──> pong? ──yes──> PongTracker
//!                                 │
//!                                 no
//!                                 ▼
//!                          inbound channel ──> SocketClient::read
//! ```
//!
//! The slot is the only place a transport lives. Every access goes through
//! the accessors below, which check the generation under the lock, so a
//! caller can never hold on to a transport across a swap.

use crate::config::PingConfig;
use crate::shared::Shared;
use crate::traits::*;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// A transport failure attributed to one generation
#[derive(Debug)]
pub(crate) struct Failure {
    pub(crate) generation: u64,
    pub(crate) error: SocketError,
}

struct Slot {
    generation: u64,
    transport: Option<Arc<dyn Transport>>,
}

/// Serializes writes against the current physical connection
pub struct Dispatcher {
    slot: RwLock<Slot>,
    /// Held for the duration of one write, and for every swap
    write_lock: Mutex<()>,
    write_timeout: Duration,
    failures: UnboundedSender<Failure>,
}

impl Dispatcher {
    pub(crate) fn new(write_timeout: Duration) -> (Self, UnboundedReceiver<Failure>) {
        let (failures, failure_rx) = unbounded_channel();
        let dispatcher = Self {
            slot: RwLock::new(Slot {
                generation: 0,
                transport: None,
            }),
            write_lock: Mutex::new(()),
            write_timeout,
            failures,
        };
        (dispatcher, failure_rx)
    }

    /// Latest generation handed out (0 before the first connection)
    pub fn generation(&self) -> u64 {
        self.slot.read().generation
    }

    /// Whether the latest generation still has a live transport
    pub fn is_active(&self) -> bool {
        self.slot.read().transport.is_some()
    }

    /// Write a frame on whatever generation is current
    ///
    /// Returns the generation the frame was written on.
    pub async fn write(&self, frame: Frame) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let (generation, transport) = {
            let slot = self.slot.read();
            let transport = slot.transport.clone().ok_or(SocketError::NotConnected)?;
            (slot.generation, transport)
        };
        self.write_locked(generation, transport.as_ref(), frame).await?;
        Ok(generation)
    }

    /// Write a frame only if `generation` is still current
    pub async fn write_for(&self, generation: u64, frame: Frame) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let transport = {
            let slot = self.slot.read();
            if slot.generation != generation {
                return Err(SocketError::StaleGeneration {
                    requested: generation,
                    current: slot.generation,
                });
            }
            slot.transport.clone().ok_or(SocketError::NotConnected)?
        };
        self.write_locked(generation, transport.as_ref(), frame).await
    }

    /// Caller must hold the write lock
    async fn write_locked(&self, generation: u64, transport: &dyn Transport, frame: Frame) -> Result<()> {
        let result = match tokio::time::timeout(self.write_timeout, transport.write_frame(frame)).await {
            Ok(result) => result,
            Err(_) => Err(SocketError::Timeout(format!(
                "write did not complete within {:?}",
                self.write_timeout
            ))),
        };

        if let Err(ref e) = result {
            if e.is_recoverable() {
                self.report_failure(generation, SocketError::Transport(e.to_string()));
            }
        }
        result
    }

    /// Publish a freshly dialed transport as the next generation
    ///
    /// `on_connect` frames are written on the new transport before it becomes
    /// visible to other writers. If any of them fails the transport is not
    /// published and the generation counter is left untouched.
    pub(crate) async fn install(&self, transport: Arc<dyn Transport>, on_connect: &[Frame]) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        for frame in on_connect {
            match tokio::time::timeout(self.write_timeout, transport.write_frame(frame.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(SocketError::Timeout(
                        "on-connect frame not written in time".to_string(),
                    ))
                }
            }
        }

        let mut slot = self.slot.write();
        slot.generation += 1;
        if slot.transport.replace(transport).is_some() {
            // Supervisor retires before dialing again, so this is a bug upstream
            warn!("Replaced a transport that was never retired");
        }
        debug!("Installed transport as generation {}", slot.generation);
        Ok(slot.generation)
    }

    /// Remove and close the transport of `generation`, if it is still current
    ///
    /// Returns true if a transport was closed.
    pub(crate) async fn retire(&self, generation: u64) -> bool {
        let transport = {
            let _guard = self.write_lock.lock().await;
            let mut slot = self.slot.write();
            if slot.generation != generation {
                return false;
            }
            slot.transport.take()
        };

        match transport {
            Some(transport) => {
                if let Err(e) = transport.close().await {
                    debug!("Error closing generation {}: {}", generation, e);
                }
                debug!("Retired generation {}", generation);
                true
            }
            None => false,
        }
    }

    /// Tell the supervisor that `generation` is broken
    pub(crate) fn report_failure(&self, generation: u64, error: SocketError) {
        // Receiver is gone only once the supervisor exited
        let _ = self.failures.send(Failure { generation, error });
    }
}

/// Read frames from one generation until it fails or is cancelled
///
/// Exactly one of these runs per generation; it is the only reader of its
/// transport.
pub(crate) async fn read_loop(
    shared: Arc<Shared>,
    generation: u64,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
) {
    debug!("Read loop started (generation {})", generation);
    let ping: &PingConfig = shared.config.ping();

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = transport.read_frame() => result,
        };

        match result {
            Ok(frame) => {
                if ping.is_pong(&frame) {
                    shared.tracker.record_pong_received();
                    shared.metrics.increment_pongs();
                    trace!("Pong received (generation {})", generation);
                    continue;
                }

                shared.metrics.increment_received();
                if shared.inbound_tx.send(frame).is_err() {
                    debug!("Inbound channel closed, stopping read loop");
                    break;
                }
            }
            Err(e) => {
                if !cancel.is_cancelled() {
                    warn!("Read failed on generation {}: {}", generation, e);
                    shared.dispatcher.report_failure(generation, e);
                }
                break;
            }
        }
    }

    debug!("Read loop exiting (generation {})", generation);
}
