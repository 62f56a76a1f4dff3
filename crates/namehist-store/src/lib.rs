//! Name history record store
//!
//! Durable persistence of per-user name records and of the single
//! destination channel. The store is the only source of truth: it is
//! loaded fully at startup and written through on every mutation.
//!
//! # Backends
//!
//! - [`JsonFileStore`]: one JSON document, atomically replaced on write
//! - [`MemoryStore`]: volatile, for tests and ephemeral runs

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::StoreError;
pub use snapshot::StoreSnapshot;
pub use store::{JsonFileStore, MemoryStore, RecordStore};
