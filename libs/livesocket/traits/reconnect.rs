use rand::Rng;
use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Implement this trait to control how the supervisor behaves between
/// connection attempts.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before dialing again
    /// * `None` - Retry budget exhausted
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Reset the strategy state (called after successful connection)
    fn reset(&mut self);

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// Delays between attempts grow exponentially:
/// initial_delay * 2^attempt, capped at max_delay.
/// With jitter enabled the delay is drawn uniformly from `[0, capped]`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The initial delay before first reconnect
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
            jitter: false,
        }
    }

    /// Enable or disable full jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay for `attempt` before jitter is applied
    pub fn capped_delay(&self, attempt: usize) -> Duration {
        let max_ms = self.max_delay.as_millis() as u64;
        let factor = 2u64.checked_pow(attempt.min(u32::MAX as usize) as u32);
        let delay_ms = factor
            .and_then(|f| (self.initial_delay.as_millis() as u64).checked_mul(f))
            .unwrap_or(u64::MAX);
        Duration::from_millis(delay_ms.min(max_ms))
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let delay = self.capped_delay(attempt);
        if self.jitter && !delay.is_zero() {
            let ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64);
            return Some(Duration::from_millis(ms));
        }
        Some(delay)
    }

    fn reset(&mut self) {
        // No state to reset for exponential backoff
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// Create a new fixed delay strategy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
///
/// The first failure is final
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
