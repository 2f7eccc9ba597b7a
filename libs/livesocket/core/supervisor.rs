//! Connection supervisor
//!
//! Owns the dial → run → retire → backoff cycle. One supervisor task runs per
//! client for its whole lifetime.
//!
//! ```text
//!          ┌──────────── backoff (strategy delay, cancellable) ◄──────────┐
//!          ▼                                                              │
//!  dial ──ok──> install (gen+1) ──> Connected ──> wait for Failure(gen) ──┤
//!    │                                                                    │
//!    └──err──> Disconnected { generation: None } ─────────────────────────┘
//! ```
//!
//! Cancellation of the client's root token aborts a pending dial, a backoff
//! sleep or a running generation immediately.

use crate::connection_state::ConnectionState;
use crate::dispatcher::{read_loop, Failure};
use crate::events::ClientEvent;
use crate::heartbeat::spawn_heartbeat;
use crate::shared::Shared;
use crate::traits::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Sends the outcome of the very first connection to `SocketClient::connect`
pub(crate) type ReadySender = oneshot::Sender<Result<u64>>;

/// How a generation ended
enum GenerationEnd {
    Shutdown,
    Failed { generation: u64, reason: String },
}

pub(crate) fn spawn_supervisor(
    shared: Arc<Shared>,
    dialer: Arc<dyn Dialer>,
    strategy: Box<dyn ReconnectionStrategy>,
    failures: UnboundedReceiver<Failure>,
    ready: ReadySender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_supervisor(shared, dialer, strategy, failures, ready).await;
    })
}

async fn run_supervisor(
    shared: Arc<Shared>,
    dialer: Arc<dyn Dialer>,
    mut strategy: Box<dyn ReconnectionStrategy>,
    mut failures: UnboundedReceiver<Failure>,
    ready: ReadySender,
) {
    let mut ready = Some(ready);
    let url = shared.config.url().to_string();
    // Retries scheduled since the last successful connection
    let mut attempt = 0usize;
    // Dials made since the last successful connection
    let mut dials = 0usize;

    loop {
        if shared.shutdown.is_cancelled() {
            break;
        }

        let connecting = if ready.is_some() {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        };
        if !shared.state.advance(connecting) {
            break;
        }

        dials += 1;
        debug!("Dialing {} (dial {} since last connection)", url, dials);
        let dialed = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            dialed = dialer.dial(&url) => dialed,
        };

        let installed = match dialed {
            Ok(transport) => {
                match shared
                    .dispatcher
                    .install(Arc::clone(&transport), &shared.config.subscriptions)
                    .await
                {
                    Ok(generation) => Ok((generation, transport)),
                    Err(e) => {
                        let _ = transport.close().await;
                        Err(e)
                    }
                }
            }
            Err(e) => Err(e),
        };

        match installed {
            Ok((generation, transport)) => {
                attempt = 0;
                dials = 0;
                strategy.reset();

                match run_generation(&shared, generation, transport, &mut failures, &mut ready).await {
                    GenerationEnd::Shutdown => break,
                    GenerationEnd::Failed { generation, reason } => {
                        shared.events.emit(ClientEvent::Disconnected {
                            generation: Some(generation),
                            reason,
                        });
                    }
                }
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", url, e);
                shared.events.emit(ClientEvent::Disconnected {
                    generation: None,
                    reason: e.to_string(),
                });
            }
        }

        if !shared.state.advance(ConnectionState::Reconnecting) {
            break;
        }

        // Apply reconnection delay offset (immediate wait after disconnect)
        let offset = shared.config.reconnection_delay_offset;
        if !offset.is_zero() {
            debug!("Waiting reconnection delay offset: {:?}", offset);
            if !sleep_or_cancel(&shared, offset).await {
                break;
            }
        }

        match strategy.next_delay(attempt) {
            Some(delay) => {
                attempt += 1;
                info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                shared.events.emit(ClientEvent::Reconnecting { attempt, delay });
                if !sleep_or_cancel(&shared, delay).await {
                    break;
                }
            }
            None => {
                error!("Reconnection strategy exhausted after {} dials, giving up", dials);
                shared.lost_after.store(dials, Ordering::Release);
                if shared.state.advance(ConnectionState::Lost) {
                    shared.events.emit(ClientEvent::ConnectionLost { attempts: dials });
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(SocketError::ConnectionLost { attempts: dials }));
                    }
                }
                // Unblock pending reads
                shared.shutdown.cancel();
                break;
            }
        }
    }

    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(shared.terminal_error()));
    }
    info!("Supervisor exiting");
}

/// Run one installed generation until it fails or the client shuts down
async fn run_generation(
    shared: &Arc<Shared>,
    generation: u64,
    transport: Arc<dyn Transport>,
    failures: &mut UnboundedReceiver<Failure>,
    ready: &mut Option<ReadySender>,
) -> GenerationEnd {
    shared.tracker.reset();
    let cancel = shared.shutdown.child_token();

    let reader = tokio::spawn(read_loop(
        Arc::clone(shared),
        generation,
        Arc::clone(&transport),
        cancel.clone(),
    ));
    let heartbeat = if shared.config.ping().pinging_enabled() {
        Some(spawn_heartbeat(Arc::clone(shared), generation, cancel.clone()))
    } else {
        None
    };

    let end = if shared.state.advance(ConnectionState::Connected) {
        if generation > 1 {
            shared.metrics.increment_reconnects();
        }
        info!("Connected to {} (generation {})", shared.config.url(), generation);
        shared.events.emit(ClientEvent::Connected { generation });
        if let Some(tx) = ready.take() {
            let _ = tx.send(Ok(generation));
        }
        wait_for_failure(generation, &cancel, failures).await
    } else {
        GenerationEnd::Shutdown
    };

    cancel.cancel();
    shared.dispatcher.retire(generation).await;
    let _ = reader.await;
    if let Some(handle) = heartbeat {
        let _ = handle.await;
    }
    end
}

async fn wait_for_failure(
    generation: u64,
    cancel: &tokio_util::sync::CancellationToken,
    failures: &mut UnboundedReceiver<Failure>,
) -> GenerationEnd {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return GenerationEnd::Shutdown,
            failure = failures.recv() => match failure {
                Some(failure) if failure.generation == generation => {
                    warn!("Generation {} failed: {}", generation, failure.error);
                    return GenerationEnd::Failed {
                        generation,
                        reason: failure.error.to_string(),
                    };
                }
                Some(failure) => {
                    debug!(
                        "Ignoring failure from stale generation {} (current {})",
                        failure.generation, generation
                    );
                }
                None => return GenerationEnd::Shutdown,
            }
        }
    }
}

/// Sleep for `duration` unless the client shuts down first
///
/// Returns false if shutdown won.
async fn sleep_or_cancel(shared: &Shared, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shared.shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
