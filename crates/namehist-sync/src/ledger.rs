//! Name history ledger
//!
//! The entry point for everything that changes history or its messages:
//! - Applying observed name transitions
//! - Changing the destination channel and re-rendering every message
//! - Read-only history queries
//!
//! # Ordering
//!
//! For one user, merge → persist → reconcile → persist runs inside that
//! user's critical section. History is always persisted before any message
//! is touched, and a message failure never rolls history back.

use crate::error::{HistoryError, HistoryResult};
use crate::locks::UserLocks;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::sink::MessageSink;
use futures::StreamExt;
use namehist_core::{
    detect, merge, ChannelId, CyclePolicy, MemberUpdate, NameSource, Transition, UserId,
    UserRecord,
};
use namehist_store::RecordStore;
use std::sync::Arc;

/// Default number of users reconciled at once during a sweep
pub const DEFAULT_RESYNC_CONCURRENCY: usize = 4;

/// Tunables for [`NameLedger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Treatment of a past name that becomes current again
    pub cycle_policy: CyclePolicy,
    /// Which member name is tracked from member updates
    pub name_source: NameSource,
    /// Users reconciled concurrently during a sweep (at least 1)
    pub resync_concurrency: usize,
}

impl LedgerSettings {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_name_source(mut self, source: NameSource) -> Self {
        self.name_source = source;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_resync_concurrency(mut self, concurrency: usize) -> Self {
        self.resync_concurrency = concurrency.max(1);
        self
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::default(),
            name_source: NameSource::default(),
            resync_concurrency: DEFAULT_RESYNC_CONCURRENCY,
        }
    }
}

/// Result of applying one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Old and new names are equal; nothing happened
    Ignored,
    /// The record already reflected the transition and no destination is set
    Unchanged(UserRecord),
    /// History saved; no destination, so no message was attempted
    Recorded(UserRecord),
    /// Message reconciled, after saving history if it changed
    Synced {
        record: UserRecord,
        sync: ReconcileOutcome,
    },
}

impl TransitionOutcome {
    /// Record after the transition, if one was touched
    #[must_use]
    pub fn record(&self) -> Option<&UserRecord> {
        match self {
            Self::Ignored => None,
            Self::Unchanged(r) | Self::Recorded(r) | Self::Synced { record: r, .. } => Some(r),
        }
    }
}

/// A user whose message could not be reconciled during a sweep
#[derive(Debug)]
pub struct SweepFailure {
    pub user_id: UserId,
    pub error: HistoryError,
}

/// Summary of a full resync sweep
#[derive(Debug, Default)]
pub struct ResyncReport {
    /// Destination the sweep targeted; `None` when none is configured
    pub destination: Option<ChannelId>,
    /// Records visited
    pub total: usize,
    pub created: usize,
    pub recreated: usize,
    pub edited: usize,
    pub failures: Vec<SweepFailure>,
}

impl ResyncReport {
    fn new(destination: Option<ChannelId>) -> Self {
        Self {
            destination,
            ..Self::default()
        }
    }

    /// Users whose message now matches their record
    #[inline]
    #[must_use]
    pub fn reconciled(&self) -> usize {
        self.created + self.recreated + self.edited
    }

    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn tally(&mut self, user_id: UserId, result: HistoryResult<ReconcileOutcome>) {
        match result {
            Ok(ReconcileOutcome::Created(_)) => self.created += 1,
            Ok(ReconcileOutcome::Recreated { .. }) => self.recreated += 1,
            Ok(ReconcileOutcome::Edited(_)) => self.edited += 1,
            Ok(ReconcileOutcome::Disabled) => {}
            Err(error) => self.failures.push(SweepFailure { user_id, error }),
        }
    }
}

/// Tracks name changes and keeps one history message per user in sync
pub struct NameLedger {
    store: Arc<dyn RecordStore>,
    reconciler: Reconciler,
    locks: UserLocks,
    settings: LedgerSettings,
}

impl std::fmt::Debug for NameLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameLedger")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl NameLedger {
    /// Create ledger with default settings
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, sink: Arc<dyn MessageSink>) -> Self {
        Self::with_settings(store, sink, LedgerSettings::default())
    }

    #[must_use]
    pub fn with_settings(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn MessageSink>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            reconciler: Reconciler::new(sink),
            locks: UserLocks::new(),
            settings: settings.with_resync_concurrency(settings.resync_concurrency),
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Apply a name change of `user_id` from `old_name` to `new_name`
    ///
    /// # Errors
    /// - `HistoryError::StorageUnavailable` if history could not be saved;
    ///   nothing was committed and no message was touched
    /// - `HistoryError::ArtifactSyncFailed` if history was saved but the
    ///   message could not be reconciled
    pub async fn on_name_transition(
        &self,
        user_id: UserId,
        old_name: &str,
        new_name: &str,
    ) -> HistoryResult<TransitionOutcome> {
        self.apply(&Transition::new(user_id, old_name, new_name))
            .await
    }

    /// Detect and apply the name change carried by a member update
    ///
    /// # Errors
    /// Same as [`on_name_transition`](Self::on_name_transition).
    pub async fn on_member_update(&self, update: &MemberUpdate) -> HistoryResult<TransitionOutcome> {
        match detect(update, self.settings.name_source) {
            Some(transition) => self.apply(&transition).await,
            None => Ok(TransitionOutcome::Ignored),
        }
    }

    /// Apply an observed transition
    ///
    /// # Errors
    /// Same as [`on_name_transition`](Self::on_name_transition).
    pub async fn apply(&self, transition: &Transition) -> HistoryResult<TransitionOutcome> {
        if transition.is_noop() {
            tracing::trace!(user_id = %transition.user_id, "Ignoring no-op transition");
            return Ok(TransitionOutcome::Ignored);
        }

        let _guard = self.locks.lock(transition.user_id).await;

        let existing = self.store.get(transition.user_id).await?;
        let merged = merge(existing.as_ref(), transition, self.settings.cycle_policy);
        let changed = merged.is_changed();
        let mut record = merged.into_record();

        if changed {
            self.store.put(record.clone()).await?;
            tracing::info!(
                user_id = %record.user_id,
                old = %transition.old_name,
                new = %transition.new_name,
                past = record.past_names.len(),
                "Recorded name change"
            );
        } else {
            tracing::debug!(user_id = %transition.user_id, "Transition already recorded");
        }

        let Some(destination) = self.store.destination().await? else {
            return Ok(if changed {
                TransitionOutcome::Recorded(record)
            } else {
                TransitionOutcome::Unchanged(record)
            });
        };

        let sync = self.sync_locked(destination, &mut record).await?;
        Ok(TransitionOutcome::Synced { record, sync })
    }

    /// Set the destination channel and re-render every user's message there
    ///
    /// The destination is persisted first. One user's failure does not stop
    /// the sweep; failures are collected in the report.
    ///
    /// # Errors
    /// `HistoryError::StorageUnavailable` if the destination or the record
    /// list could not be read or written.
    pub async fn set_destination(&self, destination: ChannelId) -> HistoryResult<ResyncReport> {
        self.store.set_destination(destination).await?;
        tracing::info!(channel = %destination, "Destination changed");
        self.sweep(Some(destination)).await
    }

    /// Re-run reconciliation for every user against the current destination
    ///
    /// # Errors
    /// `HistoryError::StorageUnavailable` if the store could not be read.
    pub async fn resync(&self) -> HistoryResult<ResyncReport> {
        let destination = self.store.destination().await?;
        self.sweep(destination).await
    }

    /// Past names of `user_id`, or `None` if the user was never observed
    ///
    /// # Errors
    /// `HistoryError::StorageUnavailable` if the store could not be read.
    pub async fn get_history(&self, user_id: UserId) -> HistoryResult<Option<Vec<String>>> {
        Ok(self.store.get(user_id).await?.map(|r| r.past_names))
    }

    /// Full record of `user_id`
    ///
    /// # Errors
    /// `HistoryError::StorageUnavailable` if the store could not be read.
    pub async fn record(&self, user_id: UserId) -> HistoryResult<Option<UserRecord>> {
        Ok(self.store.get(user_id).await?)
    }

    /// Currently configured destination
    ///
    /// # Errors
    /// `HistoryError::StorageUnavailable` if the store could not be read.
    pub async fn destination(&self) -> HistoryResult<Option<ChannelId>> {
        Ok(self.store.destination().await?)
    }

    async fn sweep(&self, destination: Option<ChannelId>) -> HistoryResult<ResyncReport> {
        let mut report = ResyncReport::new(destination);
        if destination.is_none() {
            tracing::info!("No destination configured, skipping resync");
            return Ok(report);
        }

        let users: Vec<UserId> = self
            .store
            .all()
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        report.total = users.len();

        let results: Vec<_> = futures::stream::iter(users)
            .map(|user_id| async move { (user_id, self.resync_user(user_id).await) })
            .buffer_unordered(self.settings.resync_concurrency)
            .collect()
            .await;

        for (user_id, result) in results {
            report.tally(user_id, result);
        }

        if report.is_clean() {
            tracing::info!(
                total = report.total,
                created = report.created,
                recreated = report.recreated,
                edited = report.edited,
                "Resync complete"
            );
        } else {
            tracing::warn!(
                total = report.total,
                failed = report.failures.len(),
                "Resync complete with failures"
            );
        }
        Ok(report)
    }

    /// Reconcile one user against the destination current at lock time
    async fn resync_user(&self, user_id: UserId) -> HistoryResult<ReconcileOutcome> {
        let _guard = self.locks.lock(user_id).await;

        let Some(destination) = self.store.destination().await? else {
            return Ok(ReconcileOutcome::Disabled);
        };
        let Some(mut record) = self.store.get(user_id).await? else {
            return Ok(ReconcileOutcome::Disabled);
        };
        self.sync_locked(destination, &mut record).await
    }

    /// Reconcile `record` and persist its new handle. Caller holds the user lock.
    async fn sync_locked(
        &self,
        destination: ChannelId,
        record: &mut UserRecord,
    ) -> HistoryResult<ReconcileOutcome> {
        let sync = match self.reconciler.reconcile(Some(destination), record).await {
            Ok(sync) => sync,
            Err(source) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    channel = %destination,
                    error = %source,
                    "History message out of sync"
                );
                return Err(HistoryError::sync_failed(record.user_id, source));
            }
        };

        let handle = sync.resolve(record.artifact_ref);
        if handle != record.artifact_ref {
            let previous = std::mem::replace(&mut record.artifact_ref, handle);
            if let Err(e) = self.store.put(record.clone()).await {
                if let Some(orphan) = handle {
                    tracing::error!(
                        user_id = %record.user_id,
                        channel = %orphan.destination,
                        message_id = %orphan.message,
                        error = %e,
                        "Posted history message but could not save its handle; delete it manually"
                    );
                }
                record.artifact_ref = previous;
                return Err(e.into());
            }
        }
        Ok(sync)
    }
}
