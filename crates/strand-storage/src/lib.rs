//! # Strand Storage
//!
//! Store adapters for the Strand event log.
//!
//! This crate provides pluggable [`LogStore`] backends. Both adapters
//! answer reads through the same key-cursor pagination driver, so a read in
//! progress sees committed changes between pages without ever visiting an
//! entry twice.
//!
//! ## Features
//!
//! - **MemoryStore**: In-memory implementation for tests and simulation
//! - **RedbStore**: Persistent implementation backed by redb
//! - **Key encoding**: Order-preserving byte keys for `created` tuples
//!
//! ## Example
//!
//! ```rust,ignore
//! use strand_core::{AddedCounter, Created, LogStore, Meta, Query};
//! use strand_storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let counter = AddedCounter::new();
//!
//!     let meta = Meta::new(Created::from([1]));
//!     let stored = store
//!         .add(serde_json::json!({ "type": "ping" }), meta, &counter)
//!         .await
//!         .unwrap();
//!     assert_eq!(stored.unwrap().added, 1);
//!
//!     let page = store.get(Query::default()).await.unwrap();
//!     assert_eq!(page.entries.len(), 1);
//! }
//! ```

pub mod key;
pub mod memory;
pub mod paging;
pub mod persistent;

// Re-exports
pub use key::encode_created;
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use paging::{Cursor, PageSource, page_after};
pub use persistent::{RedbStore, RedbStoreConfig};

// Re-export LogStore trait from strand-core for convenience
pub use strand_core::LogStore;
