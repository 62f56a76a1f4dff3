//! Name history sync
//!
//! Keeps exactly one history message per member in the destination
//! channel, in step with the record store.
//!
//! # Architecture
//!
//! ```text
//! MemberUpdate → detect → merge → RecordStore::put → Reconciler → RecordStore::put
//!                                                       │
//!                                                  MessageSink (create / fetch / edit)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use namehist_sync::NameLedger;
//!
//! # async fn example(store: Arc<dyn RecordStore>, sink: Arc<dyn MessageSink>) -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = NameLedger::new(store, sink);
//!
//! ledger.on_name_transition(UserId(42), "alice", "alicia").await?;
//! let report = ledger.set_destination(ChannelId(123)).await?;
//! println!("{} messages reconciled", report.reconciled());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod ledger;
pub mod locks;
pub mod reconciler;
pub mod sink;

pub use error::{HistoryError, HistoryResult};
pub use ledger::{
    LedgerSettings, NameLedger, ResyncReport, SweepFailure, TransitionOutcome,
    DEFAULT_RESYNC_CONCURRENCY,
};
pub use locks::UserLocks;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use sink::{MessageSink, SinkError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the ledger
    pub use crate::{
        HistoryError, LedgerSettings, MessageSink, NameLedger, ReconcileOutcome, ResyncReport,
        SinkError, TransitionOutcome,
    };
    pub use namehist_core::{ArtifactRef, ChannelId, MessageId, UserId, UserRecord};
    pub use namehist_store::{JsonFileStore, MemoryStore, RecordStore};
}
