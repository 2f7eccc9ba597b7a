//! Lock-free connection state and metrics

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of the logical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// First dial in progress
    Connecting = 0,
    /// A generation is active
    Connected = 1,
    /// Previous generation failed, dialing again
    Reconnecting = 2,
    /// Closed by the caller (terminal)
    Closed = 3,
    /// Retry budget exhausted (terminal)
    Lost = 4,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Connected,
            2 => ConnectionState::Reconnecting,
            3 => ConnectionState::Closed,
            _ => ConnectionState::Lost,
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Lost)
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Transition unless the current state is terminal
    ///
    /// Returns false if the state was already terminal and was left untouched.
    pub fn advance(&self, next: ConnectionState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if ConnectionState::from_u8(current).is_terminal() {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.get().is_terminal()
    }
}

/// Atomic counters for one client
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    pongs_filtered: AtomicU64,
    pings_sent: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_pongs(&self) {
        self.pongs_filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_pings(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn pongs_filtered(&self) -> u64 {
        self.pongs_filtered.load(Ordering::Relaxed)
    }

    pub fn pings_sent(&self) -> u64 {
        self.pings_sent.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}
