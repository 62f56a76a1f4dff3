//! Name history core
//!
//! The pure half of the name history ledger:
//! - Records and identifiers
//! - Detecting a name transition in a member update
//! - Merging a transition into a record
//! - Rendering a record into its history message
//!
//! Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```rust
//! use namehist_core::{merge, render, CyclePolicy, Transition, UserId};
//!
//! let transition = Transition::new(UserId(42), "alice", "alicia");
//! let record = merge(None, &transition, CyclePolicy::Retain).into_record();
//!
//! assert_eq!(record.past_names, vec!["alice"]);
//! assert_eq!(render(&record).title, "Name History for alicia");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod detect;
pub mod error;
pub mod merge;
pub mod render;
pub mod types;

pub use detect::{detect, MemberSnapshot, MemberUpdate};
pub use error::ParseIdError;
pub use merge::{merge, MergeOutcome};
pub use render::{render, EmbedField, MessageContent};
pub use types::{
    ArtifactRef, ChannelId, CyclePolicy, MessageId, NameSource, Transition, UserId, UserRecord,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
