//! Live query subscriptions.
//!
//! The registry maps each namespace to its subscriptions, kept in
//! subscription order and indexed by a stable id. Collections call
//! [`LiveQueryRegistry::notify`] after every successful mutation, and each
//! subscriber re-evaluates its own cursor.
//!
//! Subscribe, unsubscribe and notify are serialized on one reentrant
//! dispatch lock. A notification pass works on a snapshot taken when the
//! pass starts, so unsubscribing from inside a callback does not disturb
//! the pass in progress. The lock is reentrant so a callback may mutate the
//! namespace it watches.

use crate::cursor::Cursor;
use crate::types::Namespace;
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// A live query callback. Receives the subscribed cursor.
pub type LiveCallback = Arc<dyn Fn(&Cursor) + Send + Sync>;

struct Subscription {
    cursor: Cursor,
    callback: LiveCallback,
}

impl Subscription {
    fn deliver(&self) {
        if catch_unwind(AssertUnwindSafe(|| (self.callback)(&self.cursor))).is_err() {
            tracing::warn!(
                namespace = %self.cursor.namespace(),
                "live query callback panicked"
            );
        }
    }
}

/// Per-handle table of live query subscriptions.
pub struct LiveQueryRegistry {
    dispatch: ReentrantMutex<()>,
    subscriptions: RwLock<HashMap<Namespace, BTreeMap<u64, Arc<Subscription>>>>,
    next_id: AtomicU64,
}

impl LiveQueryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dispatch: ReentrantMutex::new(()),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes `cursor` and delivers the first callback immediately.
    ///
    /// No notification can slip in between registration and the first
    /// delivery.
    pub fn subscribe(self: &Arc<Self>, cursor: Cursor, callback: LiveCallback) -> LiveQuery {
        let _dispatch = self.dispatch.lock();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let namespace = cursor.namespace().clone();
        let subscription = Arc::new(Subscription { cursor, callback });

        self.subscriptions
            .write()
            .entry(namespace.clone())
            .or_default()
            .insert(id, Arc::clone(&subscription));
        tracing::trace!(namespace = %namespace, id, "live query subscribed");

        subscription.deliver();

        LiveQuery {
            registry: Arc::downgrade(self),
            namespace,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Invokes every current subscriber of `namespace`, in subscription
    /// order. Returns the number of callbacks invoked.
    pub fn notify(&self, namespace: &Namespace) -> usize {
        let _dispatch = self.dispatch.lock();
        let snapshot: Vec<Arc<Subscription>> = match self.subscriptions.read().get(namespace) {
            Some(subs) => subs.values().cloned().collect(),
            None => return 0,
        };

        tracing::trace!(namespace = %namespace, subscribers = snapshot.len(), "notifying live queries");
        for subscription in &snapshot {
            subscription.deliver();
        }
        snapshot.len()
    }

    /// Returns the number of subscriptions on `namespace`.
    pub fn subscriber_count(&self, namespace: &Namespace) -> usize {
        self.subscriptions.read().get(namespace).map_or(0, BTreeMap::len)
    }

    /// Returns the namespaces that have at least one subscription.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.subscriptions.read().keys().cloned().collect()
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        let _dispatch = self.dispatch.lock();
        self.subscriptions.write().clear();
    }

    fn remove(&self, namespace: &Namespace, id: u64) -> bool {
        let _dispatch = self.dispatch.lock();
        let mut subscriptions = self.subscriptions.write();
        let Some(subs) = subscriptions.get_mut(namespace) else {
            return false;
        };
        let removed = subs.remove(&id).is_some();
        if subs.is_empty() {
            subscriptions.remove(namespace);
        }
        removed
    }
}

impl Default for LiveQueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LiveQueryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<String, usize> = self
            .subscriptions
            .read()
            .iter()
            .map(|(ns, subs)| (ns.to_string(), subs.len()))
            .collect();
        f.debug_struct("LiveQueryRegistry")
            .field("subscriptions", &counts)
            .finish()
    }
}

/// Handle to one live subscription.
///
/// Dropping the handle leaves the subscription in place; it ends only when
/// [`LiveQuery::unsubscribe`] is called or the registry is cleared.
#[derive(Debug)]
pub struct LiveQuery {
    registry: Weak<LiveQueryRegistry>,
    namespace: Namespace,
    id: u64,
    active: AtomicBool,
}

impl LiveQuery {
    /// Ends the subscription. Later calls are no-ops.
    ///
    /// Once this returns, the callback receives no further notifications.
    /// Returns true if this call removed the subscription.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|registry| registry.remove(&self.namespace, self.id));
        if removed {
            tracing::trace!(namespace = %self.namespace, id = self.id, "live query unsubscribed");
        }
        removed
    }

    /// Returns true until `unsubscribe` has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the namespace this subscription watches.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}
