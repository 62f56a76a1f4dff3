//! Persisted store layout
//!
//! ```text
//! {
//!   "destination": 123,
//!   "users": {
//!     "42": { "user_id": 42, "current_name": "...", "past_names": [...], "artifact_ref": ... }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use namehist_core::{ChannelId, UserId, UserRecord};
use serde::{Deserialize, Serialize};

/// Full contents of a record store
///
/// Users keep their first-insertion order, which is the store's
/// enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub destination: Option<ChannelId>,
    #[serde(default)]
    pub users: IndexMap<UserId, UserRecord>,
}

impl StoreSnapshot {
    /// Check that every record is filed under its own user id
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self.users.iter().find(|(key, record)| **key != record.user_id) {
            Some((key, record)) => Err(format!(
                "record for user {} is filed under key {key}",
                record.user_id
            )),
            None => Ok(()),
        }
    }

    /// Insert or replace `record`, returning a value that undoes the change
    pub(crate) fn upsert(&mut self, record: UserRecord) -> Undo {
        let user_id = record.user_id;
        match self.users.insert(user_id, record) {
            Some(previous) => Undo::Restore(previous),
            None => Undo::Remove(user_id),
        }
    }

    pub(crate) fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Restore(previous) => {
                self.users.insert(previous.user_id, previous);
            }
            Undo::Remove(user_id) => {
                self.users.shift_remove(&user_id);
            }
        }
    }
}

/// Reverts a single [`StoreSnapshot::upsert`]
#[derive(Debug)]
pub(crate) enum Undo {
    Restore(UserRecord),
    Remove(UserId),
}
