//! Lifecycle events
//!
//! Every transition of the logical connection is published twice: on an
//! unbounded crossbeam channel (polled with `recv_event`/`try_recv_event`)
//! and to the registered hooks, which run inline on the supervisor task and
//! must not block. Hooks are called on a snapshot of the hook list, so a
//! hook may register further hooks; those see the next event.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle events emitted by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A new generation is active
    Connected { generation: u64 },
    /// A dial attempt failed (`generation` is None) or an active generation died
    Disconnected {
        generation: Option<u64>,
        reason: String,
    },
    /// Waiting `delay` before dial attempt number `attempt` (1-indexed)
    Reconnecting { attempt: usize, delay: Duration },
    /// Closed by the caller
    Closed,
    /// Retry budget exhausted
    ConnectionLost { attempts: usize },
}

pub type ConnectedHook = Arc<dyn Fn(u64) + Send + Sync>;
pub type DisconnectedHook = Arc<dyn Fn(Option<u64>, &str) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) connected: Vec<ConnectedHook>,
    pub(crate) disconnected: Vec<DisconnectedHook>,
}

pub(crate) struct EventBus {
    tx: Sender<ClientEvent>,
    rx: Receiver<ClientEvent>,
    hooks: RwLock<Hooks>,
}

impl EventBus {
    pub(crate) fn new(hooks: Hooks) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            hooks: RwLock::new(hooks),
        }
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        match &event {
            ClientEvent::Connected { generation } => {
                let hooks = self.hooks.read().connected.clone();
                for hook in &hooks {
                    hook(*generation);
                }
            }
            ClientEvent::Disconnected { generation, reason } => {
                let hooks = self.hooks.read().disconnected.clone();
                for hook in &hooks {
                    hook(*generation, reason.as_str());
                }
            }
            _ => {}
        }
        // Receiver lives as long as the bus, send cannot fail
        let _ = self.tx.send(event);
    }

    pub(crate) fn on_connected(&self, hook: ConnectedHook) {
        self.hooks.write().connected.push(hook);
    }

    pub(crate) fn on_disconnected(&self, hook: DisconnectedHook) {
        self.hooks.write().disconnected.push(hook);
    }

    pub(crate) fn receiver(&self) -> &Receiver<ClientEvent> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[test]
    fn test_hooks_and_channel_both_see_events() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_hook = Arc::clone(&seen);

        let bus = EventBus::new(Hooks::default());
        bus.on_connected(Arc::new(move |generation| {
            seen_hook.store(generation, Ordering::SeqCst);
        }));

        bus.emit(ClientEvent::Connected { generation: 7 });
        bus.emit(ClientEvent::Closed);

        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(
            bus.receiver().try_recv().unwrap(),
            ClientEvent::Connected { generation: 7 }
        );
        assert_eq!(bus.receiver().try_recv().unwrap(), ClientEvent::Closed);
        assert!(bus.receiver().try_recv().is_err());
    }

    #[test]
    fn test_hook_can_register_hooks() {
        let bus = Arc::new(EventBus::new(Hooks::default()));
        let late_calls = Arc::new(AtomicUsize::new(0));

        let registering_bus = Arc::clone(&bus);
        let registered_calls = Arc::clone(&late_calls);
        bus.on_connected(Arc::new(move |_| {
            let calls = Arc::clone(&registered_calls);
            registering_bus.on_connected(Arc::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        // Returns instead of deadlocking; the new hook only sees later events
        bus.emit(ClientEvent::Connected { generation: 1 });
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        bus.emit(ClientEvent::Connected { generation: 2 });
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }
}
