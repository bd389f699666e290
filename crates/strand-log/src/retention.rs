//! Retention rules for garbage collection
//!
//! A keeper is a predicate over `(event, meta)`. During a sweep an entry
//! survives when at least one registered keeper returns true for it.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use strand_core::Meta;

/// Predicate deciding whether an entry must be retained
pub type Predicate<E> = Arc<dyn Fn(&E, &Meta) -> bool + Send + Sync>;

struct KeeperSet<E> {
    next_id: u64,
    predicates: BTreeMap<u64, Predicate<E>>,
}

/// Handle returned by `keep`
///
/// [`Keeper::release`] is idempotent. Dropping the handle leaves the
/// predicate registered.
pub struct Keeper {
    release: Box<dyn Fn() + Send + Sync>,
}

impl Keeper {
    /// Remove the predicate this handle was created for
    pub fn release(&self) {
        (self.release)();
    }
}

impl std::fmt::Debug for Keeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Keeper")
    }
}

/// The registered keepers of one log
pub struct Keepers<E> {
    inner: Arc<Mutex<KeeperSet<E>>>,
}

impl<E> Default for Keepers<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(KeeperSet {
                next_id: 0,
                predicates: BTreeMap::new(),
            })),
        }
    }
}

impl<E: 'static> Keepers<E> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate
    pub fn keep(&self, predicate: impl Fn(&E, &Meta) -> bool + Send + Sync + 'static) -> Keeper {
        let id = {
            let mut set = self.inner.lock();
            let id = set.next_id;
            set.next_id += 1;
            set.predicates.insert(id, Arc::new(predicate));
            id
        };

        let inner: Weak<Mutex<KeeperSet<E>>> = Arc::downgrade(&self.inner);
        Keeper {
            release: Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.lock().predicates.remove(&id);
                }
            }),
        }
    }

    /// Whether any registered keeper retains this entry
    ///
    /// Predicates run outside the lock, so a predicate may register or
    /// release keepers without deadlocking.
    pub fn retains(&self, event: &E, meta: &Meta) -> bool {
        let predicates: Vec<Predicate<E>> = self.inner.lock().predicates.values().cloned().collect();
        predicates.iter().any(|keep| keep(event, meta))
    }

    /// Number of registered keepers
    pub fn len(&self) -> usize {
        self.inner.lock().predicates.len()
    }

    /// Whether no keepers are registered
    pub fn is_empty(&self) -> bool {
        self.inner.lock().predicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::Created;

    fn meta(created: i64) -> Meta {
        Meta::new(Created::from([created]))
    }

    #[test]
    fn test_nothing_retained_without_keepers() {
        let keepers: Keepers<&'static str> = Keepers::new();
        assert!(keepers.is_empty());
        assert!(!keepers.retains(&"a", &meta(1)));
    }

    #[test]
    fn test_any_keeper_retains() {
        let keepers: Keepers<&'static str> = Keepers::new();
        keepers.keep(|event, _| *event == "a");
        keepers.keep(|_, meta| meta.created == Created::from([2]));

        assert!(keepers.retains(&"a", &meta(1)));
        assert!(keepers.retains(&"b", &meta(2)));
        assert!(!keepers.retains(&"b", &meta(1)));
    }

    #[test]
    fn test_release_removes_only_its_keeper() {
        let keepers: Keepers<&'static str> = Keepers::new();
        let first = keepers.keep(|_, _| true);
        keepers.keep(|event, _| *event == "a");

        first.release();
        first.release();

        assert_eq!(keepers.len(), 1);
        assert!(keepers.retains(&"a", &meta(1)));
        assert!(!keepers.retains(&"b", &meta(1)));
    }

    #[test]
    fn test_dropping_handle_keeps_predicate() {
        let keepers: Keepers<&'static str> = Keepers::new();
        drop(keepers.keep(|_, _| true));
        assert!(keepers.retains(&"a", &meta(1)));
    }

    #[test]
    fn test_predicate_may_release_itself() {
        let keepers: Arc<Keepers<&'static str>> = Arc::new(Keepers::new());
        let slot: Arc<Mutex<Option<Keeper>>> = Arc::new(Mutex::new(None));

        let own = slot.clone();
        let keeper = keepers.keep(move |_, _| {
            if let Some(keeper) = own.lock().as_ref() {
                keeper.release();
            }
            false
        });
        *slot.lock() = Some(keeper);

        assert!(!keepers.retains(&"a", &meta(1)));
        assert!(keepers.is_empty());
    }
}
