//! Core types for the name history ledger
//!
//! Defines:
//! - Platform identifiers (users, channels, messages)
//! - The per-user history record
//! - Observed name transitions
//! - Policy knobs for merging and name extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseIdError;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw snowflake value
            #[inline]
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| ParseIdError::new(stringify!($name), s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake_id!(
    /// Stable member identifier
    UserId
);
snowflake_id!(
    /// Channel a history message is rendered into
    ChannelId
);
snowflake_id!(
    /// Identifier of a rendered history message
    MessageId
);

/// Handle to the rendered message for one user
///
/// The platform addresses a message by channel and message id, so the
/// handle records both. A handle whose channel is not the configured
/// destination is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Channel holding the message
    pub destination: ChannelId,
    /// Message id within that channel
    pub message: MessageId,
}

impl ArtifactRef {
    #[inline]
    #[must_use]
    pub fn new(destination: ChannelId, message: MessageId) -> Self {
        Self {
            destination,
            message,
        }
    }

    /// Whether this handle addresses a message in `destination`
    #[inline]
    #[must_use]
    pub fn is_in(&self, destination: ChannelId) -> bool {
        self.destination == destination
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.destination, self.message)
    }
}

/// Durable name history of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Member the record belongs to
    pub user_id: UserId,
    /// Most recently observed name
    pub current_name: String,
    /// Prior names in the order they were first seen, without duplicates
    #[serde(default)]
    pub past_names: Vec<String>,
    /// Rendered message, if one is known to exist
    #[serde(default)]
    pub artifact_ref: Option<ArtifactRef>,
}

impl UserRecord {
    /// Create a record with no past names and no rendered message
    #[must_use]
    pub fn new(user_id: UserId, current_name: impl Into<String>) -> Self {
        Self {
            user_id,
            current_name: current_name.into(),
            past_names: Vec::new(),
            artifact_ref: None,
        }
    }

    /// With past names, dropping empties and repeats
    #[must_use]
    pub fn with_past_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.remember(name.into());
        }
        self
    }

    /// With a rendered message handle
    #[inline]
    #[must_use]
    pub fn with_artifact(mut self, artifact: ArtifactRef) -> Self {
        self.artifact_ref = Some(artifact);
        self
    }

    /// Whether `name` is already recorded as a past name
    #[inline]
    #[must_use]
    pub fn has_past_name(&self, name: &str) -> bool {
        self.past_names.iter().any(|n| n == name)
    }

    /// Append `name` to the past names unless it is empty or already present.
    ///
    /// Returns `true` if the name was appended.
    pub(crate) fn remember(&mut self, name: String) -> bool {
        if name.is_empty() || self.has_past_name(&name) {
            return false;
        }
        self.past_names.push(name);
        true
    }
}

/// An observed change of one member's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub user_id: UserId,
    /// Name before the change; empty when it was never observed
    pub old_name: String,
    pub new_name: String,
}

impl Transition {
    #[must_use]
    pub fn new(user_id: UserId, old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            user_id,
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// A transition whose old and new names are equal changes nothing
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.old_name == self.new_name
    }
}

/// What happens to a past name when a member switches back to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Keep it in the past names; the current name is tracked separately
    #[default]
    Retain,
    /// Drop it from the past names while it is the current name
    Remove,
}

/// Which member name is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// Server nickname, falling back to global name, then username
    #[default]
    DisplayName,
    /// Account username only
    Username,
}
