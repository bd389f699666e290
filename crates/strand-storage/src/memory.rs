//! In-memory store adapter
//!
//! This module provides an in-memory [`LogStore`] implementation, suitable
//! for tests, simulation, and short-lived logs.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strand_core::{AddedCounter, Created, LogStore, Meta, Order, Page, Query, StoreError};
use tracing::{debug, trace};

use crate::paging::{Cursor, PageSource, page_after};

/// Configuration for the in-memory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum entries per page returned by `get`
    pub page_size: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

/// Entries indexed by `created` and by `added`
#[derive(Debug)]
struct MemoryIndex<E> {
    by_created: BTreeMap<Created, (E, Meta)>,
    by_added: BTreeMap<u64, Created>,
    /// Highest `added` ever stored, kept after that entry is removed
    last_added: u64,
}

impl<E> Default for MemoryIndex<E> {
    fn default() -> Self {
        Self {
            by_created: BTreeMap::new(),
            by_added: BTreeMap::new(),
            last_added: 0,
        }
    }
}

/// In-memory implementation of LogStore
///
/// A single mutex guards both indices, which makes the duplicate check,
/// the `added` draw, and the insertion one atomic step.
#[derive(Debug)]
pub struct MemoryStore<E> {
    index: Arc<Mutex<MemoryIndex<E>>>,
    config: MemoryStoreConfig,
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> MemoryStore<E> {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create with a custom configuration
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            index: Arc::new(Mutex::new(MemoryIndex::default())),
            config,
        }
    }

    /// Create with a custom page size
    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_config(MemoryStoreConfig { page_size })
    }

    /// Get the configuration
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.index.lock().by_created.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.index.lock().by_created.is_empty()
    }
}

impl<E: Clone> MemoryStore<E> {
    /// Snapshot of all entries in descending `order`
    pub fn entries(&self, order: Order) -> Vec<(E, Meta)> {
        let index = self.index.lock();
        match order {
            Order::Created => index.by_created.values().rev().cloned().collect(),
            Order::Added => index
                .by_added
                .values()
                .rev()
                .filter_map(|created| index.by_created.get(created).cloned())
                .collect(),
        }
    }
}

impl<E> PageSource<E> for Mutex<MemoryIndex<E>>
where
    E: Clone + Send + Sync + 'static,
{
    fn read_page(
        &self,
        order: Order,
        before: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<(E, Meta)>, StoreError> {
        let index = self.lock();
        let entries = match (order, before) {
            (Order::Created, Some(Cursor::Created(created))) => index
                .by_created
                .range((Bound::Unbounded, Bound::Excluded(created)))
                .rev()
                .take(limit)
                .map(|(_, entry)| entry.clone())
                .collect(),
            (Order::Added, Some(Cursor::Added(added))) => index
                .by_added
                .range(..*added)
                .rev()
                .take(limit)
                .filter_map(|(_, created)| index.by_created.get(created).cloned())
                .collect(),
            (Order::Created, _) => index
                .by_created
                .values()
                .rev()
                .take(limit)
                .cloned()
                .collect(),
            (Order::Added, _) => index
                .by_added
                .values()
                .rev()
                .take(limit)
                .filter_map(|created| index.by_created.get(created).cloned())
                .collect(),
        };
        Ok(entries)
    }
}

#[async_trait]
impl<E> LogStore<E> for MemoryStore<E>
where
    E: Clone + Send + Sync + 'static,
{
    async fn add(
        &self,
        event: E,
        mut meta: Meta,
        counter: &AddedCounter,
    ) -> Result<Option<Meta>, StoreError> {
        let mut index = self.index.lock();

        if index.by_created.contains_key(&meta.created) {
            trace!(created = %meta.created, "Rejecting duplicate created tuple");
            return Ok(None);
        }

        meta.added = counter.next();
        if meta.added <= index.last_added {
            counter.release(meta.added);
            return Err(StoreError::conflict(format!(
                "added {} is already assigned in this store",
                meta.added
            )));
        }
        index.last_added = meta.added;
        index.by_added.insert(meta.added, meta.created.clone());
        index
            .by_created
            .insert(meta.created.clone(), (event, meta.clone()));

        trace!(created = %meta.created, added = meta.added, "Stored entry");
        Ok(Some(meta))
    }

    async fn get(&self, query: Query) -> Result<Page<E>, StoreError> {
        page_after(self.index.clone(), query.order, None, self.config.page_size).await
    }

    async fn remove(&self, created: &Created) -> Result<bool, StoreError> {
        let mut index = self.index.lock();

        match index.by_created.remove(created) {
            Some((_, meta)) => {
                index.by_added.remove(&meta.added);
                debug!(created = %created, added = meta.added, "Removed entry");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn last_added(&self) -> u64 {
        self.index.lock().last_added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn meta(created: i64) -> Meta {
        Meta::new(Created::from([created]))
    }

    async fn store_with(created: &[i64]) -> (MemoryStore<Value>, AddedCounter) {
        let store: MemoryStore<Value> = MemoryStore::new();
        let counter = AddedCounter::new();
        for c in created {
            store
                .add(json!({ "type": "t", "n": c }), meta(*c), &counter)
                .await
                .unwrap();
        }
        (store, counter)
    }

    fn created_values(entries: &[(Value, Meta)]) -> Vec<Created> {
        entries.iter().map(|(_, m)| m.created.clone()).collect()
    }

    #[tokio::test]
    async fn test_add_assigns_added() {
        let store: MemoryStore<Value> = MemoryStore::new();
        let counter = AddedCounter::new();

        let first = store.add(json!({ "type": "a" }), meta(5), &counter).await.unwrap();
        let second = store.add(json!({ "type": "b" }), meta(1), &counter).await.unwrap();

        assert_eq!(first.unwrap().added, 1);
        assert_eq!(second.unwrap().added, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_created_is_rejected_without_drawing() {
        let store: MemoryStore<Value> = MemoryStore::new();
        let counter = AddedCounter::new();

        assert!(store.add(json!({ "type": "a" }), meta(0), &counter).await.unwrap().is_some());
        assert!(store.add(json!({ "type": "b" }), meta(0), &counter).await.unwrap().is_none());

        assert_eq!(counter.last(), 1);
        let entries = store.entries(Order::Created);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, json!({ "type": "a" }));
    }

    #[tokio::test]
    async fn test_entries_orders() {
        let (store, _) = store_with(&[1, 3, 2]).await;

        assert_eq!(
            created_values(&store.entries(Order::Created)),
            vec![Created::from([3]), Created::from([2]), Created::from([1])]
        );
        assert_eq!(
            created_values(&store.entries(Order::Added)),
            vec![Created::from([2]), Created::from([3]), Created::from([1])]
        );
    }

    #[tokio::test]
    async fn test_get_paginates_in_created_order() {
        let store: MemoryStore<Value> = MemoryStore::with_page_size(2);
        let counter = AddedCounter::new();
        for c in [4, 1, 5, 2, 3] {
            store.add(json!({ "type": "t" }), meta(c), &counter).await.unwrap();
        }

        let first = store.get(Query::default()).await.unwrap();
        assert_eq!(created_values(&first.entries), vec![Created::from([5]), Created::from([4])]);

        let second = first.next.unwrap().fetch().await.unwrap();
        assert_eq!(created_values(&second.entries), vec![Created::from([3]), Created::from([2])]);

        let third = second.next.unwrap().fetch().await.unwrap();
        assert_eq!(created_values(&third.entries), vec![Created::from([1])]);
        assert!(third.next.is_none());
    }

    #[tokio::test]
    async fn test_get_paginates_in_added_order() {
        let store: MemoryStore<Value> = MemoryStore::with_page_size(2);
        let counter = AddedCounter::new();
        for c in [4, 1, 5] {
            store.add(json!({ "type": "t" }), meta(c), &counter).await.unwrap();
        }

        let first = store.get(Query::ordered_by(Order::Added)).await.unwrap();
        assert_eq!(created_values(&first.entries), vec![Created::from([5]), Created::from([1])]);

        let second = first.next.unwrap().fetch().await.unwrap();
        assert_eq!(created_values(&second.entries), vec![Created::from([4])]);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_removal_between_pages_is_not_revisited() {
        let store: MemoryStore<Value> = MemoryStore::with_page_size(1);
        let counter = AddedCounter::new();
        for c in [1, 2, 3] {
            store.add(json!({ "type": "t" }), meta(c), &counter).await.unwrap();
        }

        let first = store.get(Query::default()).await.unwrap();
        assert_eq!(created_values(&first.entries), vec![Created::from([3])]);

        store.remove(&Created::from([3])).await.unwrap();
        store.remove(&Created::from([2])).await.unwrap();

        let second = first.next.unwrap().fetch().await.unwrap();
        assert_eq!(created_values(&second.entries), vec![Created::from([1])]);
        assert!(second.next.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _) = store_with(&[1, 2]).await;

        assert!(store.remove(&Created::from([1])).await.unwrap());
        assert!(!store.remove(&Created::from([1])).await.unwrap());

        assert_eq!(store.len(), 1);
        assert_eq!(store.entries(Order::Added).len(), 1);
    }

    #[tokio::test]
    async fn test_second_counter_conflicts() {
        let (store, _) = store_with(&[1]).await;
        let other = AddedCounter::new();

        let result = store.add(json!({ "type": "b" }), meta(2), &other).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(other.last(), 0);

        // A value freed by removal is still taken
        store.remove(&Created::from([1])).await.unwrap();
        let result = store.add(json!({ "type": "b" }), meta(2), &other).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_last_added() {
        let (store, _) = store_with(&[1, 2, 3]).await;
        assert_eq!(store.last_added(), 3);

        store.remove(&Created::from([3])).await.unwrap();
        assert_eq!(store.last_added(), 3);
    }
}
