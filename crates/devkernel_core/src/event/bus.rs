//! Synchronous, single-threaded event bus.
//!
//! # Responsibility
//! - Deliver each emitted event to matching listeners in registration order.
//! - Keep a routing queue the kernel context drains to coordinate managers.
//!
//! # Invariants
//! - A failing or panicking listener never blocks delivery to later listeners.
//! - A listener is never invoked re-entrantly. Events emitted from inside a
//!   listener are queued and delivered to every matching listener once the
//!   current dispatch finishes.
//! - Cloned handles share one listener table.

use crate::event::types::KernelEvent;
use log::{trace, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Value returned by listeners; `Err` is logged and isolated.
pub type ListenerResult = Result<(), String>;

type ListenerFn = dyn FnMut(&KernelEvent) -> ListenerResult;

/// Handle returned by [`EventBus::on`] used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Topic {
    Named(String),
    Any,
}

impl Topic {
    fn matches(&self, event_name: &str) -> bool {
        match self {
            Self::Named(name) => name == event_name,
            Self::Any => true,
        }
    }
}

struct ListenerEntry {
    id: ListenerId,
    topic: Topic,
    callback: Rc<RefCell<Box<ListenerFn>>>,
}

#[derive(Default)]
struct BusState {
    next_listener_id: u64,
    listeners: Vec<ListenerEntry>,
    routed: VecDeque<KernelEvent>,
    dispatching: bool,
    deferred: VecDeque<KernelEvent>,
}

/// Shared event bus handle.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to one wire event name, e.g. `file:created`.
    pub fn on<F>(&self, event_name: &str, listener: F) -> ListenerId
    where
        F: FnMut(&KernelEvent) -> ListenerResult + 'static,
    {
        self.subscribe(Topic::Named(event_name.trim().to_string()), Box::new(listener))
    }

    /// Subscribes to every event.
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&KernelEvent) -> ListenerResult + 'static,
    {
        self.subscribe(Topic::Any, Box::new(listener))
    }

    /// Removes one listener. Returns `false` when the id is unknown.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|entry| entry.id != id);
        state.listeners.len() != before
    }

    /// Delivers `event` to matching listeners and queues it for routing.
    ///
    /// Returns the number of listeners that handled the event successfully.
    /// An event emitted by a listener is delivered after the running dispatch
    /// and returns 0.
    pub fn emit(&self, event: KernelEvent) -> usize {
        {
            let mut state = self.state.borrow_mut();
            state.routed.push_back(event.clone());
            if state.dispatching {
                trace!("event=bus_defer module=event name={}", event.name());
                state.deferred.push_back(event);
                return 0;
            }
            state.dispatching = true;
        }

        let delivered = self.deliver(&event);
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let next = state.deferred.pop_front();
                if next.is_none() {
                    state.dispatching = false;
                }
                next
            };
            match next {
                Some(nested) => {
                    self.deliver(&nested);
                }
                None => break,
            }
        }
        delivered
    }

    fn deliver(&self, event: &KernelEvent) -> usize {
        let name = event.name();
        let targets: Vec<(ListenerId, Rc<RefCell<Box<ListenerFn>>>)> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|entry| entry.topic.matches(name))
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();
        trace!(
            "event=bus_emit module=event name={} listeners={}",
            name,
            targets.len()
        );

        let mut delivered = 0;
        for (id, callback) in targets {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                warn!(
                    "event=bus_reentrant_skip module=event status=error name={} listener={}",
                    name, id.0
                );
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| (&mut **callback)(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(message)) => warn!(
                    "event=listener_failed module=event status=error name={} listener={} message={}",
                    name, id.0, message
                ),
                Err(_) => warn!(
                    "event=listener_panicked module=event status=error name={} listener={}",
                    name, id.0
                ),
            }
        }
        delivered
    }

    /// Drains events queued since the last call, in emission order.
    pub fn take_routed(&self) -> Vec<KernelEvent> {
        self.state.borrow_mut().routed.drain(..).collect()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Drops every listener and any unrouted events.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.listeners.clear();
        state.routed.clear();
        state.deferred.clear();
    }

    fn subscribe(&self, topic: Topic, callback: Box<ListenerFn>) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_listener_id += 1;
        let id = ListenerId(state.next_listener_id);
        state.listeners.push(ListenerEntry {
            id,
            topic,
            callback: Rc::new(RefCell::new(callback)),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use crate::event::types::KernelEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn opened(path: &str) -> KernelEvent {
        KernelEvent::FileOpened {
            path: path.to_string(),
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            bus.on("file:opened", move |_| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }

        assert_eq!(bus.emit(opened("/a")), 3);
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_and_panicking_listeners_are_isolated() {
        let bus = EventBus::new();
        let reached = Rc::new(RefCell::new(false));
        bus.on("file:opened", |_| Err("boom".to_string()));
        bus.on("file:opened", |_| panic!("listener panic"));
        let flag = Rc::clone(&reached);
        bus.on("file:opened", move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        assert_eq!(bus.emit(opened("/a")), 1);
        assert!(*reached.borrow());
    }

    #[test]
    fn off_removes_listener_and_other_names_are_not_delivered() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = bus.on("file:opened", move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        bus.emit(KernelEvent::FileClosed {
            path: "/a".to_string(),
        });
        assert_eq!(*count.borrow(), 0);

        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(opened("/a"));
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn nested_emit_is_delivered_after_current_dispatch() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_any(move |event| {
            sink.borrow_mut().push(format!("any {}", event.name()));
            if event.name() == "file:opened" {
                inner_bus.emit(KernelEvent::FileClosed {
                    path: "/a".to_string(),
                });
            }
            Ok(())
        });
        let sink = Rc::clone(&seen);
        bus.on("file:opened", move |_| {
            sink.borrow_mut().push("named file:opened".to_string());
            Ok(())
        });

        assert_eq!(bus.emit(opened("/a")), 2);
        assert_eq!(
            *seen.borrow(),
            vec!["any file:opened", "named file:opened", "any file:closed"]
        );
        assert_eq!(bus.take_routed().len(), 2);

        bus.emit(opened("/b"));
        assert_eq!(seen.borrow().len(), 6);
    }

    #[test]
    fn routed_queue_preserves_emission_order() {
        let bus = EventBus::new();
        bus.emit(opened("/a"));
        bus.emit(opened("/b"));
        let routed = bus.take_routed();
        assert_eq!(routed, vec![opened("/a"), opened("/b")]);
        assert!(bus.take_routed().is_empty());
    }
}
