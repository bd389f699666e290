//! # Strand Core
//!
//! Core traits, types, and errors for the Strand event log.
//!
//! This crate holds the vocabulary shared by the log engine and its
//! collaborators, so that store adapters and timestamp sources can be
//! written without depending on the engine itself.
//!
//! ## Key Traits
//!
//! - [`Event`]: Application events carrying a `type` discriminator
//! - [`Timer`]: Source of logical `created` timestamps
//! - [`LogStore`]: Pluggable persistence with keyed insertion and paginated reads
//!
//! ## Key Types
//!
//! - [`Created`]: Tuple logical clock compared lexicographically
//! - [`Meta`]: Metadata stored alongside every event
//! - [`Page`]: One page of entries plus an optional continuation
//! - [`AddedCounter`]: Per-log local insertion counter

pub mod clock;
pub mod error;
pub mod event;
pub mod meta;
pub mod store;
pub mod timer;

// Re-export main types
pub use clock::*;
pub use error::*;
pub use event::*;
pub use meta::*;
pub use store::*;
pub use timer::*;
