//! Distributes firmware-originated events to per-interface subscribers
//! (spec.md §4.2).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

pub type EventId = u32;
pub type Callback = Box<dyn Fn(&Event) + Send>;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: EventId,
    pub bss_index: u8,
    pub data: Vec<u8>,
}

struct Subscription {
    id: u64,
    bss_index: Option<u8>,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    by_event: HashMap<EventId, Vec<Subscription>>,
    next_id: u64,
}

#[derive(Default)]
pub struct EventHandler {
    inner: Mutex<Inner>,
}

impl EventHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(EventHandler::default())
    }

    pub fn register_global(self: &Arc<Self>, event_id: EventId, callback: Callback) -> Registration {
        self.register(event_id, None, callback)
    }

    pub fn register_interface(
        self: &Arc<Self>,
        event_id: EventId,
        bss_index: u8,
        callback: Callback,
    ) -> Registration {
        self.register(event_id, Some(bss_index), callback)
    }

    fn register(self: &Arc<Self>, event_id: EventId, bss_index: Option<u8>, callback: Callback) -> Registration {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .by_event
            .entry(event_id)
            .or_default()
            .push(Subscription { id, bss_index, callback });
        Registration {
            handler: Arc::downgrade(self),
            event_id,
            id: Some(id),
        }
    }

    /// Invoked by the moal integration layer when firmware delivers an
    /// event. Callbacks run with the handler's mutex held, so they must not
    /// synchronously register or unregister subscriptions on this handler.
    pub fn on_event(&self, event: &Event) {
        let inner = self.inner.lock().unwrap();
        if let Some(subs) = inner.by_event.get(&event.event_id) {
            for sub in subs {
                if sub.bss_index.is_none() || sub.bss_index == Some(event.bss_index) {
                    (sub.callback)(event);
                }
            }
        }
    }

    fn unregister(&self, event_id: EventId, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(subs) = inner.by_event.get_mut(&event_id) {
            subs.retain(|s| s.id != id);
        }
    }
}

/// Move-only RAII handle for a live subscription. Its destructor
/// unregisters the subscription; reassigning it unregisters whatever it
/// previously held first.
pub struct Registration {
    handler: Weak<EventHandler>,
    event_id: EventId,
    id: Option<u64>,
}

impl Registration {
    /// An already-unregistered placeholder, useful where a `Registration`
    /// field must be populated before a real one exists.
    pub fn empty() -> Self {
        Registration {
            handler: Weak::new(),
            event_id: 0,
            id: None,
        }
    }

    pub fn unregister(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(handler) = self.handler.upgrade() {
                handler.unregister(self.event_id, id);
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn global_subscription_receives_any_interface() {
        let handler = EventHandler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _reg = handler.register_global(1, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        handler.on_event(&Event { event_id: 1, bss_index: 0, data: vec![] });
        handler.on_event(&Event { event_id: 1, bss_index: 1, data: vec![] });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn interface_subscription_filters_by_bss_index() {
        let handler = EventHandler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _reg = handler.register_interface(1, 0, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        handler.on_event(&Event { event_id: 1, bss_index: 1, data: vec![] });
        assert_eq!(count.load(Ordering::SeqCst), 0);
        handler.on_event(&Event { event_id: 1, bss_index: 0, data: vec![] });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unregisters_subscription() {
        let handler = EventHandler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let reg = handler.register_global(1, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        drop(reg);
        handler.on_event(&Event { event_id: 1, bss_index: 0, data: vec![] });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reassignment_unregisters_prior_subscription() {
        let handler = EventHandler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut reg = handler.register_global(1, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let count2 = Arc::new(AtomicUsize::new(0));
        let c2 = count2.clone();
        reg = handler.register_global(2, Box::new(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        }));
        handler.on_event(&Event { event_id: 1, bss_index: 0, data: vec![] });
        handler.on_event(&Event { event_id: 2, bss_index: 0, data: vec![] });
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
        drop(reg);
    }
}
