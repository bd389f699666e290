//! Listener registry
//!
//! An [`Emitter`] maps each channel to an ordered list of registrations.
//! Every registration gets a numeric id when it is created; unsubscribing
//! removes the registration with that id, so the same callback registered
//! twice is two independent registrations.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use strand_core::Meta;

/// Callback invoked with each accepted event
pub type Listener<E> = Arc<dyn Fn(&E, &Meta) + Send + Sync>;

struct Registration<E> {
    id: u64,
    once: bool,
    listener: Listener<E>,
}

struct Registry<K, E> {
    next_id: u64,
    channels: HashMap<K, Vec<Registration<E>>>,
}

impl<K: Eq + Hash, E> Registry<K, E> {
    fn remove(&mut self, key: &K, id: u64) {
        if let Some(registrations) = self.channels.get_mut(key) {
            registrations.retain(|r| r.id != id);
            if registrations.is_empty() {
                self.channels.remove(key);
            }
        }
    }
}

/// Handle returned by `on` / `once`
///
/// Calling [`Subscription::unsubscribe`] more than once is safe. Dropping
/// the handle leaves the listener registered.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Remove this registration
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}

/// Registry of listeners keyed by channel
pub struct Emitter<K, E> {
    registry: Arc<Mutex<Registry<K, E>>>,
}

impl<K, E> Default for Emitter<K, E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                channels: HashMap::new(),
            })),
        }
    }
}

impl<K, E> Emitter<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: 'static,
{
    /// Create an empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener that fires on every emit
    pub fn on(
        &self,
        key: K,
        listener: impl Fn(&E, &Meta) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(key, false, Arc::new(listener))
    }

    /// Register a listener that fires on the next emit only
    pub fn once(
        &self,
        key: K,
        listener: impl Fn(&E, &Meta) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(key, true, Arc::new(listener))
    }

    fn subscribe(&self, key: K, once: bool, listener: Listener<E>) -> Subscription {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .channels
                .entry(key.clone())
                .or_default()
                .push(Registration { id, once, listener });
            id
        };

        let registry: Weak<Mutex<Registry<K, E>>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().remove(&key, id);
                }
            }),
        }
    }

    /// Invoke every listener on a channel, in registration order
    ///
    /// One-shot registrations are removed before any listener runs, and the
    /// lock is released before invoking, so listeners may subscribe or
    /// unsubscribe freely. Returns the number of listeners invoked.
    pub fn emit(&self, key: &K, event: &E, meta: &Meta) -> usize {
        let listeners: Vec<Listener<E>> = {
            let mut registry = self.registry.lock();
            let Some(registrations) = registry.channels.get_mut(key) else {
                return 0;
            };
            let listeners = registrations.iter().map(|r| r.listener.clone()).collect();
            registrations.retain(|r| !r.once);
            if registrations.is_empty() {
                registry.channels.remove(key);
            }
            listeners
        };

        for listener in &listeners {
            listener(event, meta);
        }
        listeners.len()
    }

    /// Number of listeners registered on a channel
    pub fn listener_count(&self, key: &K) -> usize {
        self.registry
            .lock()
            .channels
            .get(key)
            .map(|r| r.len())
            .unwrap_or(0)
    }
}
