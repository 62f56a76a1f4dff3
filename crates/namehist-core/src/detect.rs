//! Change detection
//!
//! Extracts a name [`Transition`] from a platform member-update event.

use crate::types::{NameSource, Transition, UserId};
use serde::{Deserialize, Serialize};

/// Name-relevant view of a guild member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub nick: Option<String>,
}

impl MemberSnapshot {
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            global_name: None,
            nick: None,
        }
    }

    #[must_use]
    pub fn with_global_name(mut self, global_name: impl Into<String>) -> Self {
        self.global_name = Some(global_name.into());
        self
    }

    #[must_use]
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// Name shown in the guild: nickname, then global name, then username
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nick
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.global_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(self.username.as_str())
    }

    /// The tracked name under `source`
    #[must_use]
    pub fn name(&self, source: NameSource) -> &str {
        match source {
            NameSource::DisplayName => self.display_name(),
            NameSource::Username => self.username.as_str(),
        }
    }
}

/// A member update as delivered by the gateway
///
/// `before` is absent when the member was not cached before the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    #[serde(default)]
    pub before: Option<MemberSnapshot>,
    pub after: MemberSnapshot,
}

/// Extract the name transition carried by `update`, if any.
///
/// Returns `None` when the tracked name did not change. A missing or
/// mismatched `before` snapshot yields an empty old name.
#[must_use]
pub fn detect(update: &MemberUpdate, source: NameSource) -> Option<Transition> {
    let new_name = update.after.name(source);
    let old_name = update
        .before
        .as_ref()
        .filter(|b| b.user_id == update.after.user_id)
        .map_or("", |b| b.name(source));

    if old_name == new_name {
        return None;
    }
    Some(Transition::new(update.after.user_id, old_name, new_name))
}
