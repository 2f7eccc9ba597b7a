//! PONG Response Tracker
//!
//! Tracks PING/PONG timing for one logical connection. The read loop records
//! PONGs, the heartbeat task records PINGs and checks deadlines.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks PONG responses to detect dead connections
///
/// Uses atomic operations for lock-free access from the read loop and the
/// heartbeat task. Timestamps are stored as "marks": milliseconds since an
/// internal epoch plus one, so that zero always means "never".
pub struct PongTracker {
    epoch: Instant,
    /// Last PING sent (mark)
    last_ping_mark: AtomicU64,
    /// Last PONG received (mark)
    last_pong_mark: AtomicU64,
    /// Timeout threshold - if no PONG within this duration after PING, connection is unhealthy
    timeout: Duration,
}

impl PongTracker {
    /// Create a new PONG tracker with the specified timeout
    ///
    /// # Arguments
    /// * `timeout` - Duration to wait for PONG after PING
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_ping_mark: AtomicU64::new(0),
            last_pong_mark: AtomicU64::new(0),
            timeout,
        }
    }

    #[inline]
    fn now_mark(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 + 1
    }

    /// Record that a PING was just sent, returning its mark
    pub fn record_ping_sent(&self) -> u64 {
        let mark = self.now_mark();
        self.last_ping_mark.store(mark, Ordering::Release);
        mark
    }

    /// Record that a PONG was just received
    pub fn record_pong_received(&self) {
        let mark = self.now_mark();
        self.last_pong_mark.store(mark, Ordering::Release);
    }

    /// Whether a PONG arrived at or after the PING identified by `ping_mark`
    pub fn pong_since(&self, ping_mark: u64) -> bool {
        self.last_pong_mark.load(Ordering::Acquire) >= ping_mark
    }

    /// Check if the connection appears healthy
    ///
    /// Returns false only if a PING was sent, no PONG followed it, and the
    /// timeout has elapsed since that PING.
    pub fn is_healthy(&self) -> bool {
        let ping = self.last_ping_mark.load(Ordering::Acquire);
        let pong = self.last_pong_mark.load(Ordering::Acquire);

        if ping == 0 || pong >= ping {
            return true;
        }

        let since_ping_ms = self.now_mark().saturating_sub(ping);
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        since_ping_ms < timeout_ms
    }

    /// Get time since last PONG was received
    ///
    /// Returns None if no PONG has ever been received.
    pub fn time_since_last_pong(&self) -> Option<Duration> {
        self.since(self.last_pong_mark.load(Ordering::Acquire))
    }

    /// Get time since last PING was sent
    ///
    /// Returns None if no PING has ever been sent.
    pub fn time_since_last_ping(&self) -> Option<Duration> {
        self.since(self.last_ping_mark.load(Ordering::Acquire))
    }

    fn since(&self, mark: u64) -> Option<Duration> {
        if mark == 0 {
            return None;
        }
        Some(Duration::from_millis(self.now_mark().saturating_sub(mark)))
    }

    /// Reset the tracker state
    ///
    /// Called by the supervisor whenever a new generation is installed.
    pub fn reset(&self) {
        self.last_ping_mark.store(0, Ordering::Release);
        self.last_pong_mark.store(0, Ordering::Release);
    }
}
