//! Liveness monitor for one connection generation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐
//! │  Heartbeat Task         │
//! │  (one per generation)   │
//! │                         │
//! │  Every interval:        │
//! │  1. Check cancellation  │
//! │  2. Record PING mark    │
//! │  3. write_for(gen) ─────┼──> Dispatcher ──> Transport
//! │                         │
//! │  At pong deadline:      │
//! │  PONG since mark? ──no──┼──> report_failure(gen) ──> Supervisor
//! └─────────────────────────┘
//! ```
//!
//! The task owns a child of the client's cancellation token. When the
//! generation is superseded the supervisor cancels it, and any write that
//! still slips through is rejected by the dispatcher as stale.

use crate::shared::Shared;
use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawn the heartbeat task for `generation`
///
/// The ticker is anchored here, not when the task first runs, so the first
/// ping goes out one interval after the generation was installed.
///
/// Callers must only spawn this when pinging is enabled (non-zero interval).
pub(crate) fn spawn_heartbeat(
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let interval = shared.config.ping().interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    // If we miss ticks due to slow writes, skip them rather than bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tokio::spawn(async move {
        heartbeat_task(shared, generation, ticker, cancel).await;
    })
}

async fn heartbeat_task(
    shared: Arc<Shared>,
    generation: u64,
    mut ticker: tokio::time::Interval,
    cancel: CancellationToken,
) {
    let ping = shared.config.ping();
    let deadline = ping.pong_deadline();
    debug!(
        "Heartbeat started (generation {}, interval {:?}, pong deadline {:?})",
        generation,
        ping.interval(),
        deadline
    );

    // Oldest unanswered ping: (mark, deadline instant)
    let mut outstanding: Option<(u64, Instant)> = None;

    loop {
        let due = outstanding.map(|(_, at)| at);
        let pong_due = async move {
            match due {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = pong_due => {
                if let Some((mark, _)) = outstanding.take() {
                    if !shared.tracker.pong_since(mark) {
                        let waited = deadline.unwrap_or(Duration::ZERO);
                        warn!("No pong within {:?} on generation {}, forcing reconnect", waited, generation);
                        shared.dispatcher.report_failure(
                            generation,
                            SocketError::Timeout(format!("no pong within {:?}", waited)),
                        );
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                if let Some((mark, _)) = outstanding {
                    if shared.tracker.pong_since(mark) {
                        outstanding = None;
                    }
                }

                // Mark before writing: a fast pong must never predate its ping
                let mark = shared.tracker.record_ping_sent();
                match shared.dispatcher.write_for(generation, ping.ping().clone()).await {
                    Ok(()) => {
                        shared.metrics.increment_pings();
                        shared.metrics.increment_sent();
                        if let (None, Some(d)) = (outstanding, deadline) {
                            outstanding = Some((mark, Instant::now() + d));
                        }
                    }
                    Err(SocketError::StaleGeneration { current, .. }) => {
                        debug!("Generation {} superseded by {}, heartbeat stopping", generation, current);
                        break;
                    }
                    Err(e) => {
                        // Transport errors were already reported by the dispatcher
                        debug!("Heartbeat write failed on generation {}: {}", generation, e);
                        break;
                    }
                }
            }
        }
    }

    debug!("Heartbeat exiting (generation {})", generation);
}
