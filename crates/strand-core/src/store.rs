//! Store adapter abstraction
//!
//! The log never touches physical storage itself. A [`LogStore`] persists
//! `(event, meta)` pairs, rejects duplicate `created` tuples atomically,
//! answers paginated reads, and removes entries during garbage collection.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::clock::Created;
use crate::error::StoreError;
use crate::meta::Meta;

/// Iteration order for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Descending `created` tuple, most recent logical event first
    #[default]
    Created,
    /// Descending local insertion order, most recently added first
    Added,
}

/// Options for a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Query {
    pub order: Order,
}

impl Query {
    /// Read in the given order
    pub fn ordered_by(order: Order) -> Self {
        Self { order }
    }
}

/// Future resolving to a page of entries
pub type PageFuture<E> = BoxFuture<'static, Result<Page<E>, StoreError>>;

/// Continuation yielding the page after the current one
pub struct NextPage<E> {
    fetch: Box<dyn FnOnce() -> PageFuture<E> + Send>,
}

impl<E> NextPage<E> {
    /// Wrap a continuation
    pub fn new(fetch: impl FnOnce() -> PageFuture<E> + Send + 'static) -> Self {
        Self {
            fetch: Box::new(fetch),
        }
    }

    /// Request the next page
    pub fn fetch(self) -> PageFuture<E> {
        (self.fetch)()
    }
}

impl<E> std::fmt::Debug for NextPage<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NextPage")
    }
}

/// One page of a paginated read
///
/// A missing `next` marks the end of data.
#[derive(Debug)]
pub struct Page<E> {
    pub entries: Vec<(E, Meta)>,
    pub next: Option<NextPage<E>>,
}

impl<E> Page<E> {
    /// A final page
    pub fn last(entries: Vec<(E, Meta)>) -> Self {
        Self {
            entries,
            next: None,
        }
    }

    /// A page followed by more data
    pub fn with_next(entries: Vec<(E, Meta)>, next: NextPage<E>) -> Self {
        Self {
            entries,
            next: Some(next),
        }
    }

    /// An empty final page
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }
}

/// Local insertion counter owned by one log
///
/// Stores call [`AddedCounter::next`] at the point an insertion commits, so
/// values follow completion order. Values are never reused, even after
/// the entries holding them are removed.
#[derive(Debug, Default)]
pub struct AddedCounter {
    last: AtomicU64,
}

impl AddedCounter {
    /// Create a counter whose first value is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter that continues after `last`
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Draw the next value
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Give back a value whose insertion failed
    ///
    /// Succeeds only while `drawn` is still the latest value, so a value
    /// another insertion has already moved past is never handed out twice.
    pub fn release(&self, drawn: u64) -> bool {
        drawn > 0
            && self
                .last
                .compare_exchange(drawn, drawn - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
    }

    /// The most recently drawn value (0 if none)
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

/// Pluggable persistence for the log
#[async_trait]
pub trait LogStore<E>: Send + Sync {
    /// Persist an entry unless one with the same `created` tuple exists
    ///
    /// On success the store draws `added` from `counter` inside the same
    /// atomic section that inserts the entry, persists it with the entry,
    /// and returns the full metadata. On duplicate it returns `Ok(None)`
    /// without drawing from the counter. A store that fails after drawing
    /// must hand the value back with [`AddedCounter::release`].
    ///
    /// A store backs a single log: an `added` value at or below one the
    /// store has already assigned is reported as [`StoreError::Conflict`].
    async fn add(
        &self,
        event: E,
        meta: Meta,
        counter: &AddedCounter,
    ) -> Result<Option<Meta>, StoreError>;

    /// Read the first page for a query
    async fn get(&self, query: Query) -> Result<Page<E>, StoreError>;

    /// Remove the entry with this `created` tuple
    ///
    /// Returns whether an entry was removed.
    async fn remove(&self, created: &Created) -> Result<bool, StoreError>;

    /// Highest `added` value already persisted
    ///
    /// A log opened over existing data continues its counter after this.
    fn last_added(&self) -> u64 {
        0
    }
}
