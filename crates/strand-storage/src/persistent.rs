//! Persistent store adapter backed by redb
//!
//! Entries live in an `entries` table keyed by the order-preserving
//! encoding of their `created` tuple, so descending `created` reads are a
//! reverse range scan. A second `added_index` table maps each `added`
//! value back to its entry key. Values are JSON-encoded `(event, meta)`
//! pairs.

use std::marker::PhantomData;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strand_core::{AddedCounter, Created, LogStore, Meta, Order, Page, Query, StoreError};
use tracing::{debug, info, instrument, trace};

use crate::key::encode_created;
use crate::paging::{Cursor, PageSource, page_after};

// Key: encoded created tuple, Value: JSON (event, meta)
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

// Key: added value, Value: encoded created tuple
const ADDED_INDEX: TableDefinition<u64, &[u8]> = TableDefinition::new("added_index");

// Key: counter name, Value: highest value ever assigned
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const LAST_ADDED: &str = "last_added";

/// Configuration for the redb store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedbStoreConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    /// Maximum entries per page returned by `get`
    pub page_size: usize,
}

impl Default for RedbStoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/strand.redb"),
            page_size: 256,
        }
    }
}

fn db_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Database(err.to_string())
}

fn encode_entry<E: Serialize>(event: &E, meta: &Meta) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&(event, meta)).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_entry<E: DeserializeOwned>(bytes: &[u8]) -> Result<(E, Meta), StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization(e.to_string()))
}

/// Write an accepted entry and its index rows, then commit
///
/// Dropping `write_txn` on any error aborts it.
fn commit_entry(
    write_txn: WriteTransaction,
    key: &[u8],
    event: &serde_json::Value,
    meta: &Meta,
) -> Result<(), StoreError> {
    let value = encode_entry(event, meta)?;
    {
        let mut counters = write_txn.open_table(COUNTERS).map_err(db_err)?;
        let recorded = counters
            .get(LAST_ADDED)
            .map_err(db_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        if meta.added <= recorded {
            return Err(StoreError::conflict(format!(
                "added {} is already assigned in this store",
                meta.added
            )));
        }
        counters.insert(LAST_ADDED, meta.added).map_err(db_err)?;

        let mut index = write_txn.open_table(ADDED_INDEX).map_err(db_err)?;
        index.insert(meta.added, key).map_err(db_err)?;

        let mut entries = write_txn.open_table(ENTRIES).map_err(db_err)?;
        entries.insert(key, value.as_slice()).map_err(db_err)?;
    }
    write_txn.commit().map_err(db_err)
}

/// Persistent implementation of LogStore
///
/// redb serializes write transactions, which makes the duplicate check,
/// the `added` draw, and the insertion one atomic step.
pub struct RedbStore<E> {
    db: Arc<Database>,
    config: RedbStoreConfig,
    last_added: AtomicU64,
    _marker: PhantomData<fn() -> E>,
}

impl<E> std::fmt::Debug for RedbStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("config", &self.config)
            .field("last_added", &self.last_added.load(Ordering::SeqCst))
            .finish()
    }
}

impl<E> RedbStore<E> {
    /// Open or create the database
    #[instrument(skip(config), fields(path = %config.db_path.display()))]
    pub fn open(config: RedbStoreConfig) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&config.db_path).map_err(db_err)?;

        let store = Self {
            db: Arc::new(db),
            config,
            last_added: AtomicU64::new(0),
            _marker: PhantomData,
        };

        store.init_tables()?;
        let last_added = store.read_last_added()?;
        store.last_added.store(last_added, Ordering::SeqCst);

        info!(last_added, "Opened redb event store");
        Ok(store)
    }

    /// Get the configuration
    pub fn config(&self) -> &RedbStoreConfig {
        &self.config
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(db_err)?;
        let mut count = 0;
        for entry in table.iter().map_err(db_err)? {
            entry.map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(db_err)?;
        Ok(table.first().map_err(db_err)?.is_none())
    }

    fn init_tables(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;

        // Create tables if they don't exist
        write_txn.open_table(ENTRIES).map_err(db_err)?;
        write_txn.open_table(ADDED_INDEX).map_err(db_err)?;
        write_txn.open_table(COUNTERS).map_err(db_err)?;

        write_txn.commit().map_err(db_err)?;

        debug!("Initialized redb tables");
        Ok(())
    }

    /// Highest `added` ever assigned, surviving removal of that entry
    fn read_last_added(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let counters = read_txn.open_table(COUNTERS).map_err(db_err)?;
        let recorded = counters
            .get(LAST_ADDED)
            .map_err(db_err)?
            .map(|v| v.value())
            .unwrap_or(0);

        let index = read_txn.open_table(ADDED_INDEX).map_err(db_err)?;
        let indexed = index
            .last()
            .map_err(db_err)?
            .map(|(added, _)| added.value())
            .unwrap_or(0);

        Ok(recorded.max(indexed))
    }
}

impl<E> PageSource<E> for Database
where
    E: DeserializeOwned + Send + 'static,
{
    fn read_page(
        &self,
        order: Order,
        before: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<(E, Meta)>, StoreError> {
        let read_txn = self.begin_read().map_err(db_err)?;
        let entries = read_txn.open_table(ENTRIES).map_err(db_err)?;
        let mut page = Vec::with_capacity(limit);

        match order {
            Order::Created => {
                let cursor_key = match before {
                    Some(Cursor::Created(created)) => Some(encode_created(created)),
                    _ => None,
                };
                let upper: Bound<&[u8]> = match &cursor_key {
                    Some(key) => Bound::Excluded(key.as_slice()),
                    None => Bound::Unbounded,
                };

                for item in entries
                    .range::<&[u8]>((Bound::Unbounded, upper))
                    .map_err(db_err)?
                    .rev()
                    .take(limit)
                {
                    let (_, value) = item.map_err(db_err)?;
                    page.push(decode_entry(value.value())?);
                }
            }
            Order::Added => {
                let upper: Bound<u64> = match before {
                    Some(Cursor::Added(added)) => Bound::Excluded(*added),
                    _ => Bound::Unbounded,
                };
                let index = read_txn.open_table(ADDED_INDEX).map_err(db_err)?;

                for item in index
                    .range::<u64>((Bound::Unbounded, upper))
                    .map_err(db_err)?
                    .rev()
                    .take(limit)
                {
                    let (_, key) = item.map_err(db_err)?;
                    if let Some(value) = entries.get(key.value()).map_err(db_err)? {
                        page.push(decode_entry(value.value())?);
                    }
                }
            }
        }

        Ok(page)
    }
}

#[async_trait]
impl<E> LogStore<E> for RedbStore<E>
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn add(
        &self,
        event: E,
        mut meta: Meta,
        counter: &AddedCounter,
    ) -> Result<Option<Meta>, StoreError> {
        let key = encode_created(&meta.created);
        // Serialize first: an event that cannot be stored never draws a value
        let event = serde_json::to_value(&event)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(db_err)?;
        let exists = {
            let entries = write_txn.open_table(ENTRIES).map_err(db_err)?;
            entries.get(key.as_slice()).map_err(db_err)?.is_some()
        };
        if exists {
            write_txn.abort().map_err(db_err)?;
            trace!(created = %meta.created, "Rejecting duplicate created tuple");
            return Ok(None);
        }

        meta.added = counter.next();
        if let Err(err) = commit_entry(write_txn, &key, &event, &meta) {
            counter.release(meta.added);
            debug!(created = %meta.created, error = %err, "Insert failed, added value released");
            return Err(err);
        }
        self.last_added.fetch_max(meta.added, Ordering::SeqCst);

        trace!(created = %meta.created, added = meta.added, "Stored entry");
        Ok(Some(meta))
    }

    async fn get(&self, query: Query) -> Result<Page<E>, StoreError> {
        page_after(self.db.clone(), query.order, None, self.config.page_size).await
    }

    async fn remove(&self, created: &Created) -> Result<bool, StoreError> {
        let key = encode_created(created);
        let write_txn = self.db.begin_write().map_err(db_err)?;

        let removed_added = {
            let mut entries = write_txn.open_table(ENTRIES).map_err(db_err)?;
            let removed = entries.remove(key.as_slice()).map_err(db_err)?;
            match removed {
                Some(value) => {
                    let (_, meta): (serde_json::Value, Meta) = decode_entry(value.value())?;
                    Some(meta.added)
                }
                None => None,
            }
        };

        let Some(added) = removed_added else {
            write_txn.abort().map_err(db_err)?;
            return Ok(false);
        };

        {
            let mut index = write_txn.open_table(ADDED_INDEX).map_err(db_err)?;
            index.remove(added).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        debug!(created = %created, added, "Removed entry");
        Ok(true)
    }

    fn last_added(&self) -> u64 {
        self.last_added.load(Ordering::SeqCst)
    }
}
