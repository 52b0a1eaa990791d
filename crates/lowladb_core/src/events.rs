//! Named-event registry for handle-level lifecycle events.
//!
//! The event bus delivers synchronously, on the emitting thread, in
//! registration order. It is the channel the sync engine uses to report
//! `syncBegin` and `syncEnd`.
//!
//! # Usage
//!
//! ```rust
//! use lowladb_core::{EventBus, SYNC_BEGIN};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! bus.on(SYNC_BEGIN, move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! bus.emit(SYNC_BEGIN, &[]);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Emitted when a sync call starts.
pub const SYNC_BEGIN: &str = "syncBegin";

/// Emitted when a sync call finishes, whether it succeeded or not.
pub const SYNC_END: &str = "syncEnd";

/// A listener callback. Receives the arguments passed to `emit`.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Identifies one registration of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A process-wide registry of named-event listeners.
///
/// The bus:
/// - Does not de-duplicate; every `on` call is its own registration
/// - Delivers in registration order
/// - Isolates listeners, so a panicking listener does not stop the rest
/// - Is thread-safe
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `name`.
    pub fn on<F>(&self, name: &str, listener: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.on_shared(name, Arc::new(listener))
    }

    /// Registers an already shared listener for `name`.
    ///
    /// Registering the same `Arc` twice yields two invocations per emit.
    pub fn on_shared(&self, name: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(name.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes every listener for `name`. Returns how many were removed.
    pub fn off(&self, name: &str) -> usize {
        self.listeners
            .write()
            .remove(name)
            .map_or(0, |removed| removed.len())
    }

    /// Removes exactly one registration. Returns false if it was not found.
    pub fn off_listener(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(registered) = listeners.get_mut(name) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(existing, _)| *existing != id);
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(name);
        }
        removed
    }

    /// Invokes every listener currently registered for `name`.
    ///
    /// Listeners run outside the registry lock, so a listener may register or
    /// remove listeners; such changes apply from the next emit. Returns the
    /// number of listeners invoked.
    pub fn emit(&self, name: &str, args: &[Value]) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.read().get(name) {
            Some(registered) => registered.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        for listener in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(args))).is_err() {
                tracing::warn!(event = name, "event listener panicked");
            }
        }
        snapshot.len()
    }

    /// Returns the number of listeners registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map_or(0, Vec::len)
    }

    /// Removes every listener for every event.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<String> = self.listeners.read().keys().cloned().collect();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder(bus: &EventBus, name: &str, log: &Arc<Mutex<Vec<String>>>, tag: &str) -> ListenerId {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        bus.on(name, move |_| log.lock().push(tag.clone()))
    }

    #[test]
    fn emit_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        recorder(&bus, "e", &log, "first");
        recorder(&bus, "e", &log, "second");

        assert_eq!(bus.emit("e", &[]), 2);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn same_listener_twice_fires_twice() {
        let bus = EventBus::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let listener: Listener = Arc::new(move |_| *counter.lock() += 1);
        bus.on_shared("e", Arc::clone(&listener));
        bus.on_shared("e", listener);

        bus.emit("e", &[]);
        assert_eq!(*hits.lock(), 2);
    }

    #[test]
    fn off_removes_all_and_off_listener_removes_one() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = recorder(&bus, "e", &log, "first");
        recorder(&bus, "e", &log, "second");

        assert!(bus.off_listener("e", first));
        assert!(!bus.off_listener("e", first));
        bus.emit("e", &[]);
        assert_eq!(*log.lock(), vec!["second"]);

        assert_eq!(bus.off("e"), 1);
        assert_eq!(bus.emit("e", &[]), 0);
        assert_eq!(bus.listener_count("e"), 0);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.on("e", |_| panic!("listener failure"));
        recorder(&bus, "e", &log, "after");

        assert_eq!(bus.emit("e", &[]), 2);
        assert_eq!(*log.lock(), vec!["after"]);
    }

    #[test]
    fn listener_receives_arguments() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.on("data", move |args| sink.lock().extend_from_slice(args));

        bus.emit("data", &[json!(1), json!("two")]);
        assert_eq!(*seen.lock(), vec![json!(1), json!("two")]);
    }

    #[test]
    fn listener_may_unregister_during_emit() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.on("e", move |_| {
            inner.off("e");
        });
        assert_eq!(bus.emit("e", &[]), 1);
        assert_eq!(bus.listener_count("e"), 0);
    }
}
