use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::dispatcher::Dispatcher;
use crate::events::EventBus;
use crate::pong_tracker::PongTracker;
use crate::traits::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// State shared by the facade, the supervisor and the per-generation tasks
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: AtomicConnectionState,
    pub(crate) metrics: AtomicMetrics,
    pub(crate) tracker: PongTracker,
    pub(crate) events: EventBus,
    pub(crate) inbound_tx: UnboundedSender<Frame>,
    /// Root token: cancelled by close(), by budget exhaustion, or on drop
    pub(crate) shutdown: CancellationToken,
    /// Dial attempts made when the retry budget ran out
    pub(crate) lost_after: AtomicUsize,
}

impl Shared {
    /// Error returned by operations once the connection is terminal
    pub(crate) fn terminal_error(&self) -> SocketError {
        match self.state.get() {
            ConnectionState::Lost => SocketError::ConnectionLost {
                attempts: self.lost_after.load(Ordering::Acquire),
            },
            _ => SocketError::Closed,
        }
    }
}
