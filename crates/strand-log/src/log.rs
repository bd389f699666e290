//! The event log engine
//!
//! [`Log`] ties a [`Timer`] and a [`LogStore`] together. It validates and
//! stamps incoming events, delegates dedup and persistence to the store,
//! notifies listeners about accepted events, iterates stored entries page
//! by page, and garbage-collects entries no keeper wants.

use std::sync::Arc;

use strand_core::{
    AddedCounter, ConfigError, Event, LogResult, LogStore, Meta, MetaOverrides, Query, Timer,
    ValidationError,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace};

use crate::emitter::{Emitter, Subscription};
use crate::retention::{Keeper, Keepers};
use crate::sweep::{Outcome, Sweep, Visit};

/// Channels a log notifies listeners on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LogEvent {
    /// An event was accepted into the log
    Add,
}

/// Builder for a [`Log`]
pub struct LogBuilder<E> {
    timer: Option<Arc<dyn Timer>>,
    store: Option<Arc<dyn LogStore<E>>>,
}

impl<E> Default for LogBuilder<E> {
    fn default() -> Self {
        Self {
            timer: None,
            store: None,
        }
    }
}

impl<E: Event> LogBuilder<E> {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timer
    pub fn timer(self, timer: impl Timer + 'static) -> Self {
        self.shared_timer(Arc::new(timer))
    }

    /// Set a timer shared with other components
    pub fn shared_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Set the store
    pub fn store(self, store: impl LogStore<E> + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Set a store that is also held elsewhere, e.g. for inspection
    ///
    /// A store backs a single log. A second log writing to the same store
    /// fails with [`StoreError::Conflict`](strand_core::StoreError::Conflict).
    pub fn shared_store(mut self, store: Arc<dyn LogStore<E>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the log
    ///
    /// Fails if the timer or the store was never set.
    pub fn build(self) -> LogResult<Log<E>> {
        let timer = self.timer.ok_or(ConfigError::MissingTimer)?;
        let store = self.store.ok_or(ConfigError::MissingStore)?;
        Ok(Log::from_parts(timer, store))
    }
}

/// Deduplicating, re-orderable event log
pub struct Log<E: Event> {
    timer: Arc<dyn Timer>,
    store: Arc<dyn LogStore<E>>,
    added: AddedCounter,
    /// Held from insertion through notification so listeners see `added` order
    commit: Mutex<()>,
    emitter: Emitter<LogEvent, E>,
    keepers: Keepers<E>,
}

impl<E: Event> Log<E> {
    /// Create a log from a timer and a store
    pub fn new(timer: impl Timer + 'static, store: impl LogStore<E> + 'static) -> Self {
        Self::from_parts(Arc::new(timer), Arc::new(store))
    }

    /// Start building a log
    pub fn builder() -> LogBuilder<E> {
        LogBuilder::new()
    }

    fn from_parts(timer: Arc<dyn Timer>, store: Arc<dyn LogStore<E>>) -> Self {
        let last_added = store.last_added();
        if last_added > 0 {
            debug!(last_added, "Resuming added counter");
        }
        Self {
            timer,
            store,
            added: AddedCounter::starting_after(last_added),
            commit: Mutex::new(()),
            emitter: Emitter::new(),
            keepers: Keepers::new(),
        }
    }

    /// Check that an event carries a non-empty type
    pub fn validate(event: &E) -> Result<(), ValidationError> {
        match event.event_type() {
            Some(event_type) if !event_type.is_empty() => Ok(()),
            _ => Err(ValidationError::MissingType),
        }
    }

    /// Add an event, stamping it with the next timer value
    ///
    /// Returns the stored metadata, or `None` if an entry with the same
    /// `created` tuple already exists.
    ///
    /// Validation runs when the returned future is first polled, before the
    /// timer or the store is touched. Use [`Log::validate`] to check an
    /// event without adding it.
    pub async fn add(&self, event: E) -> LogResult<Option<Meta>> {
        self.add_with_meta(event, MetaOverrides::default()).await
    }

    /// Add an event with caller-supplied metadata
    ///
    /// Validates on first poll like [`Log::add`]. Listeners of concurrent
    /// adds are notified one add at a time, in `added` order.
    #[instrument(skip_all)]
    pub async fn add_with_meta(&self, event: E, overrides: MetaOverrides) -> LogResult<Option<Meta>> {
        Self::validate(&event)?;

        let meta = overrides.into_meta(|| self.timer.next());
        let created = meta.created.clone();

        let _commit = self.commit.lock().await;
        let Some(meta) = self.store.add(event.clone(), meta, &self.added).await? else {
            debug!(created = %created, "Ignoring event with known created time");
            return Ok(None);
        };

        let notified = self.emitter.emit(&LogEvent::Add, &event, &meta);
        trace!(created = %meta.created, added = meta.added, notified, "Added event");
        Ok(Some(meta))
    }

    /// Listen for every future occurrence of `event`
    pub fn on(
        &self,
        event: LogEvent,
        listener: impl Fn(&E, &Meta) + Send + Sync + 'static,
    ) -> Subscription {
        self.emitter.on(event, listener)
    }

    /// Listen for the next occurrence of `event` only
    pub fn once(
        &self,
        event: LogEvent,
        listener: impl Fn(&E, &Meta) + Send + Sync + 'static,
    ) -> Subscription {
        self.emitter.once(event, listener)
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: LogEvent) -> usize {
        self.emitter.listener_count(&event)
    }

    /// Visit stored entries, most recent first
    ///
    /// The visitor may return `()`, a `bool`, or a [`Visit`]; `false` stops
    /// the iteration before the next entry.
    #[instrument(skip_all, fields(order = ?query.order))]
    pub async fn each<F, R>(&self, query: Query, visit: F) -> LogResult<Outcome>
    where
        F: FnMut(&E, &Meta) -> R,
        R: Into<Visit>,
    {
        let mut sweep = Sweep::new(self.store.get(query));
        let outcome = sweep.run(visit).await?;
        trace!(visited = sweep.visited(), pages = sweep.pages(), ?outcome, "Iteration finished");
        Ok(outcome)
    }

    /// Protect matching entries from [`Log::clean`]
    pub fn keep(&self, predicate: impl Fn(&E, &Meta) -> bool + Send + Sync + 'static) -> Keeper {
        self.keepers.keep(predicate)
    }

    /// Number of registered keepers
    pub fn keeper_count(&self) -> usize {
        self.keepers.len()
    }

    /// Remove every entry no keeper retains
    ///
    /// Returns the number of entries removed.
    #[instrument(skip_all)]
    pub async fn clean(&self) -> LogResult<usize> {
        let mut sweep = Sweep::new(self.store.get(Query::default()));
        let mut condemned = 0;
        let mut removed = 0;

        // Remove each page's entries before the next page is read
        loop {
            let mut doomed = Vec::new();
            let mut collect = |event: &E, meta: &Meta| {
                if !self.keepers.retains(event, meta) {
                    doomed.push(meta.created.clone());
                }
            };
            let finished = sweep.run_page(&mut collect).await?;

            condemned += doomed.len();
            for created in &doomed {
                if self.store.remove(created).await? {
                    removed += 1;
                }
            }
            if finished.is_some() {
                break;
            }
        }

        info!(removed, kept = sweep.visited() - condemned, pages = sweep.pages(), "Cleaned log");
        Ok(removed)
    }

    /// Most recently assigned `added` value (0 if none)
    pub fn last_added(&self) -> u64 {
        self.added.last()
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn LogStore<E>> {
        &self.store
    }

    /// The timer used for events without a `created` tuple
    pub fn timer(&self) -> &Arc<dyn Timer> {
        &self.timer
    }
}

impl<E: Event> std::fmt::Debug for Log<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("last_added", &self.added.last())
            .field("listeners", &self.emitter.listener_count(&LogEvent::Add))
            .field("keepers", &self.keepers.len())
            .finish()
    }
}
