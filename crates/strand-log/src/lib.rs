//! # Strand Log
//!
//! The core event log of a Strand replica.
//!
//! Every event carries a `created` tuple (its logical timestamp) and, once
//! accepted, an `added` number recording local insertion order. Events
//! arriving twice with the same `created` tuple are accepted once.
//!
//! ## Features
//!
//! - **Deduplicating add**: type validation, timer stamping, store-level dedup
//! - **Listeners**: `on` / `once` with explicit unsubscribe handles
//! - **Iteration**: pull-based pagination in `created` or `added` order,
//!   cancellable from the visitor
//! - **Garbage collection**: keeper predicates decide what `clean` retains
//!
//! ## Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use strand_core::{Query, TestTimer};
//! use strand_log::{Log, LogEvent};
//! use strand_storage::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = Log::new(TestTimer::new(), MemoryStore::new());
//!     log.on(LogEvent::Add, |event, meta| println!("{} at {}", event, meta.created));
//!
//!     log.add(json!({ "type": "rename", "name": "Strand" })).await.unwrap();
//!     log.each(Query::default(), |event, _| println!("{}", event)).await.unwrap();
//! }
//! ```

pub mod emitter;
pub mod log;
pub mod retention;
pub mod sweep;

// Re-exports
pub use emitter::{Emitter, Listener, Subscription};
pub use log::{Log, LogBuilder, LogEvent};
pub use retention::{Keeper, Keepers, Predicate};
pub use sweep::{Outcome, Phase, Sweep, Visit};

pub use strand_core::{Created, LogError, LogResult, Meta, MetaOverrides, Order, Query};
