//! History merging
//!
//! Folds an observed [`Transition`] into the stored [`UserRecord`]:
//! - First sighting creates the record
//! - Prior names are appended once, in the order first observed
//! - No-op transitions leave the record untouched
//!
//! The rendered message handle is never touched here; only the reconciler
//! updates it.

use crate::types::{CyclePolicy, Transition, UserRecord};

/// Result of merging a transition into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record existed; this is the first one
    Created(UserRecord),
    /// The existing record changed
    Updated(UserRecord),
    /// Nothing changed; the record is returned as it was
    Unchanged(UserRecord),
}

impl MergeOutcome {
    /// The merged record
    #[inline]
    #[must_use]
    pub fn record(&self) -> &UserRecord {
        match self {
            Self::Created(r) | Self::Updated(r) | Self::Unchanged(r) => r,
        }
    }

    #[inline]
    #[must_use]
    pub fn into_record(self) -> UserRecord {
        match self {
            Self::Created(r) | Self::Updated(r) | Self::Unchanged(r) => r,
        }
    }

    /// Whether the record must be persisted and re-rendered
    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

/// Merge `transition` into `existing`.
///
/// # Rules
/// - `existing` absent: new record with `current_name = new`, seeded with
///   `old` as the only past name when it is non-empty and differs from `new`
/// - `old == new`: `existing` is returned unchanged
/// - otherwise `old` is appended if non-empty and not yet present, and
///   `current_name` becomes `new`
///
/// The stored current name is replaced even when it matches neither side
/// of the transition; only `old` is ever appended.
///
/// Under [`CyclePolicy::Remove`] the new current name is also dropped from
/// the past names.
#[must_use]
pub fn merge(
    existing: Option<&UserRecord>,
    transition: &Transition,
    policy: CyclePolicy,
) -> MergeOutcome {
    let Some(existing) = existing else {
        let mut record = UserRecord::new(transition.user_id, transition.new_name.clone());
        if !transition.is_noop() {
            record.remember(transition.old_name.clone());
        }
        return MergeOutcome::Created(record);
    };

    if transition.is_noop() {
        return MergeOutcome::Unchanged(existing.clone());
    }

    let mut record = existing.clone();

    record.remember(transition.old_name.clone());
    record.current_name.clone_from(&transition.new_name);

    if policy == CyclePolicy::Remove {
        record.past_names.retain(|n| *n != record.current_name);
    }

    if record == *existing {
        MergeOutcome::Unchanged(record)
    } else {
        MergeOutcome::Updated(record)
    }
}
