//! Typed session events and the subscription surface.
//!
//! Delivery is synchronous and in emit order. A handler that emits while
//! being called does not recurse: the nested event is queued and drained
//! after the current handler returns, preserving order for every
//! subscriber.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use rigproto::{ClientHandle, StatusMessage};

use crate::state::EntityChange;

/// Discrete handshake stages, reported for caller observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// Control transport open.
    Control,
    /// Client handle received.
    Handle,
    /// Identification and subscription priming complete.
    Sync,
    /// UDP data plane attached and registered.
    DataPlane,
    /// Session ready.
    Ready,
}

/// Everything a session can tell its subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One atomic state-store change.
    Change(EntityChange),
    /// A status frame, before store application details.
    Status(StatusMessage),
    /// A correlated reply (also resolved to the awaiting caller).
    Reply { seq: u32, code: u32, message: String },
    /// An uncorrelated notice from the radio.
    Notice { code: u32, text: String },
    /// Every raw inbound wire line.
    Message(String),
    /// Handshake progress.
    Progress(ConnectStage),
    /// The client handle arrived.
    HandleAssigned(ClientHandle),
    /// Emitted exactly once when the handshake completes.
    Ready,
    /// The session ended, by close or by failure.
    Disconnected { reason: String },
}

type Handler = Arc<dyn Fn(&SessionEvent) + Send + Sync + 'static>;

struct HandlerEntry {
    id: u64,
    once: bool,
    spent: bool,
    handler: Handler,
}

struct BusInner {
    next_id: u64,
    handlers: Vec<HandlerEntry>,
    queue: VecDeque<SessionEvent>,
    draining: bool,
}

/// A registered handler. `cancel` is idempotent; dropping the
/// subscription does NOT cancel it (events keep flowing to the handler).
pub struct Subscription {
    inner: Weak<Mutex<BusInner>>,
    id: u64,
}

impl Subscription {
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut bus = inner.lock().expect("event bus poisoned");
            bus.handlers.retain(|entry| entry.id != self.id);
        }
    }
}

/// Session event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 1,
                handlers: Vec::new(),
                queue: VecDeque::new(),
                draining: false,
            })),
        }
    }

    /// Subscribe for every event.
    pub fn on<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.register(handler, false)
    }

    /// Subscribe for the next event only.
    pub fn once<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.register(handler, true)
    }

    fn register<F>(&self, handler: F, once: bool) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let mut bus = self.inner.lock().expect("event bus poisoned");
        let id = bus.next_id;
        bus.next_id += 1;
        bus.handlers.push(HandlerEntry {
            id,
            once,
            spent: false,
            handler: Arc::new(handler),
        });
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Emit one event to every live handler, synchronously and in order.
    ///
    /// Re-entrant calls (a handler emitting) enqueue and return; the
    /// outermost emit drains the queue.
    pub fn emit(&self, event: SessionEvent) {
        {
            let mut bus = self.inner.lock().expect("event bus poisoned");
            bus.queue.push_back(event);
            if bus.draining {
                return;
            }
            bus.draining = true;
        }

        loop {
            let (event, handlers) = {
                let mut bus = self.inner.lock().expect("event bus poisoned");
                let Some(event) = bus.queue.pop_front() else {
                    bus.draining = false;
                    return;
                };
                let handlers: Vec<(u64, Handler)> = bus
                    .handlers
                    .iter_mut()
                    .filter(|entry| !entry.spent)
                    .map(|entry| {
                        if entry.once {
                            entry.spent = true;
                        }
                        (entry.id, Arc::clone(&entry.handler))
                    })
                    .collect();
                bus.handlers.retain(|entry| !(entry.once && entry.spent));
                (event, handlers)
            };

            for (_, handler) in handlers {
                handler(&event);
            }
        }
    }

    #[cfg(test)]
    fn handler_count(&self) -> usize {
        self.inner.lock().expect("event bus poisoned").handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn notice(code: u32) -> SessionEvent {
        SessionEvent::Notice {
            code,
            text: String::new(),
        }
    }

    #[test]
    fn delivery_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        bus.on(move |event| {
            if let SessionEvent::Notice { code, .. } = event {
                seen2.lock().unwrap().push(*code);
            }
        });
        bus.emit(notice(1));
        bus.emit(notice(2));
        bus.emit(notice(3));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn once_fires_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.once(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(notice(1));
        bus.emit(notice(2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let sub = bus.on(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(notice(1));
        sub.cancel();
        sub.cancel();
        bus.emit(notice(2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_emit_is_queued_not_recursed() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let bus2 = bus.clone();
        let seen2 = seen.clone();
        bus.on(move |event| {
            if let SessionEvent::Notice { code, .. } = event {
                seen2.lock().unwrap().push(*code);
                if *code == 1 {
                    // Must not be delivered until after this handler and
                    // any other handlers for code 1 have run.
                    bus2.emit(notice(99));
                }
            }
        });
        let seen3 = seen.clone();
        bus.on(move |event| {
            if let SessionEvent::Notice { code, .. } = event {
                seen3.lock().unwrap().push(*code + 100);
            }
        });

        bus.emit(notice(1));
        assert_eq!(*seen.lock().unwrap(), vec![1, 101, 99, 199]);
    }

    #[test]
    fn handler_subscribed_during_drain_sees_later_events() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let bus2 = bus.clone();
        let count2 = count.clone();
        bus.once(move |_| {
            let count3 = count2.clone();
            bus2.on(move |_| {
                count3.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.emit(notice(1));
        bus.emit(notice(2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
