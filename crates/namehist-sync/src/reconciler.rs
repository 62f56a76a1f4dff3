//! Artifact reconciliation
//!
//! Makes the history message of one user match its record:
//!
//! ```text
//! NoArtifact ──create──▶ Live ──edit──▶ Live
//!                         │
//!                         └─(not found / other channel)──create──▶ Live
//! ```
//!
//! A handle that no longer resolves is treated as absent and replaced,
//! so there is never more than one live message per user in the
//! destination channel.

use crate::sink::{MessageSink, SinkError};
use namehist_core::{render, ArtifactRef, ChannelId, MessageContent, UserRecord};
use std::sync::Arc;

/// What a reconciliation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No destination configured; nothing was attempted
    Disabled,
    /// Existing message edited in place
    Edited(ArtifactRef),
    /// First message posted for this user
    Created(ArtifactRef),
    /// Previous handle was stale; a replacement was posted
    Recreated {
        previous: ArtifactRef,
        current: ArtifactRef,
    },
}

impl ReconcileOutcome {
    /// Handle to the live message, if one was touched
    #[inline]
    #[must_use]
    pub fn artifact(&self) -> Option<ArtifactRef> {
        match self {
            Self::Disabled => None,
            Self::Edited(r) | Self::Created(r) | Self::Recreated { current: r, .. } => Some(*r),
        }
    }

    /// Handle to store after this outcome, given the handle stored before
    #[inline]
    #[must_use]
    pub fn resolve(&self, existing: Option<ArtifactRef>) -> Option<ArtifactRef> {
        self.artifact().or(existing)
    }

    /// Whether a new message was posted
    #[inline]
    #[must_use]
    pub fn posted(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Recreated { .. })
    }
}

/// Reconciles history messages through a [`MessageSink`]
#[derive(Clone)]
pub struct Reconciler {
    sink: Arc<dyn MessageSink>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[inline]
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self { sink }
    }

    /// Ensure exactly one message in `destination` reflects `record`.
    ///
    /// # Workflow
    /// 1. No destination: return [`ReconcileOutcome::Disabled`]
    /// 2. Render the record
    /// 3. Known handle in `destination`: fetch and edit it
    /// 4. Otherwise, or if the message is gone: post a new one
    ///
    /// # Errors
    /// Any sink error other than [`SinkError::NotFound`] during edit, and
    /// any error during create. The caller keeps its stored handle.
    pub async fn reconcile(
        &self,
        destination: Option<ChannelId>,
        record: &UserRecord,
    ) -> Result<ReconcileOutcome, SinkError> {
        let Some(destination) = destination else {
            return Ok(ReconcileOutcome::Disabled);
        };

        let content = render(record);

        let previous = match record.artifact_ref {
            Some(handle) if handle.is_in(destination) => {
                match self.edit_existing(handle, &content).await {
                    Ok(()) => {
                        tracing::debug!(user_id = %record.user_id, message = %handle, "Edited history message");
                        return Ok(ReconcileOutcome::Edited(handle));
                    }
                    Err(SinkError::NotFound) => {
                        tracing::info!(user_id = %record.user_id, message = %handle, "History message gone, recreating");
                        Some(handle)
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(handle) => {
                tracing::debug!(user_id = %record.user_id, message = %handle, channel = %destination, "Re-targeting history message");
                Some(handle)
            }
            None => None,
        };

        let message = self.sink.create_message(destination, &content).await?;
        let current = ArtifactRef::new(destination, message);
        tracing::info!(user_id = %record.user_id, message = %current, "Posted history message");

        Ok(match previous {
            Some(previous) => ReconcileOutcome::Recreated { previous, current },
            None => ReconcileOutcome::Created(current),
        })
    }

    async fn edit_existing(
        &self,
        handle: ArtifactRef,
        content: &MessageContent,
    ) -> Result<(), SinkError> {
        self.sink.fetch_message(handle).await?;
        self.sink.edit_message(handle, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockMessageSink;
    use mockall::predicate::eq;
    use namehist_core::{MessageId, UserId};

    fn record_with(handle: Option<ArtifactRef>) -> UserRecord {
        let record = UserRecord::new(UserId(42), "alicia").with_past_names(["alice"]);
        match handle {
            Some(h) => record.with_artifact(h),
            None => record,
        }
    }

    #[tokio::test]
    async fn disabled_without_destination() {
        let sink = MockMessageSink::new();
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler.reconcile(None, &record_with(None)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Disabled);
        assert_eq!(outcome.resolve(None), None);
    }

    #[tokio::test]
    async fn creates_when_no_handle() {
        let mut sink = MockMessageSink::new();
        sink.expect_create_message()
            .with(eq(ChannelId(1)), eq(render(&record_with(None))))
            .times(1)
            .returning(|_, _| Ok(MessageId(500)));
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(None))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Created(ArtifactRef::new(ChannelId(1), MessageId(500)))
        );
        assert!(outcome.posted());
    }

    #[tokio::test]
    async fn edits_live_message() {
        let handle = ArtifactRef::new(ChannelId(1), MessageId(500));
        let mut sink = MockMessageSink::new();
        sink.expect_fetch_message()
            .with(eq(handle))
            .times(1)
            .returning(|_| Ok(render(&record_with(None))));
        sink.expect_edit_message()
            .with(eq(handle), eq(render(&record_with(None))))
            .times(1)
            .returning(|_, _| Ok(()));
        sink.expect_create_message().never();
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(Some(handle)))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Edited(handle));
    }

    #[tokio::test]
    async fn recreates_when_fetch_not_found() {
        let handle = ArtifactRef::new(ChannelId(1), MessageId(500));
        let mut sink = MockMessageSink::new();
        sink.expect_fetch_message()
            .times(1)
            .returning(|_| Err(SinkError::NotFound));
        sink.expect_edit_message().never();
        sink.expect_create_message()
            .times(1)
            .returning(|_, _| Ok(MessageId(501)));
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(Some(handle)))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Recreated {
                previous: handle,
                current: ArtifactRef::new(ChannelId(1), MessageId(501)),
            }
        );
    }

    #[tokio::test]
    async fn recreates_when_edit_races_deletion() {
        let handle = ArtifactRef::new(ChannelId(1), MessageId(500));
        let mut sink = MockMessageSink::new();
        sink.expect_fetch_message()
            .returning(|_| Ok(render(&record_with(None))));
        sink.expect_edit_message()
            .times(1)
            .returning(|_, _| Err(SinkError::NotFound));
        sink.expect_create_message()
            .times(1)
            .returning(|_, _| Ok(MessageId(502)));
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(Some(handle)))
            .await
            .unwrap();
        assert!(outcome.posted());
    }

    #[tokio::test]
    async fn other_edit_errors_surface_without_create() {
        let handle = ArtifactRef::new(ChannelId(1), MessageId(500));
        let mut sink = MockMessageSink::new();
        sink.expect_fetch_message()
            .returning(|_| Err(SinkError::rejected(403, "Missing Access")));
        sink.expect_create_message().never();
        let reconciler = Reconciler::new(Arc::new(sink));

        let err = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(Some(handle)))
            .await
            .unwrap_err();
        assert_eq!(err, SinkError::rejected(403, "Missing Access"));
    }

    #[tokio::test]
    async fn handle_in_other_channel_is_replaced() {
        let old = ArtifactRef::new(ChannelId(1), MessageId(500));
        let mut sink = MockMessageSink::new();
        sink.expect_fetch_message().never();
        sink.expect_edit_message().never();
        sink.expect_create_message()
            .with(eq(ChannelId(2)), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(MessageId(900)));
        let reconciler = Reconciler::new(Arc::new(sink));

        let outcome = reconciler
            .reconcile(Some(ChannelId(2)), &record_with(Some(old)))
            .await
            .unwrap();
        assert_eq!(
            outcome.resolve(Some(old)),
            Some(ArtifactRef::new(ChannelId(2), MessageId(900)))
        );
    }

    #[tokio::test]
    async fn create_failure_surfaces() {
        let mut sink = MockMessageSink::new();
        sink.expect_create_message()
            .returning(|_, _| Err(SinkError::Transport("connection reset".into())));
        let reconciler = Reconciler::new(Arc::new(sink));

        let err = reconciler
            .reconcile(Some(ChannelId(1)), &record_with(None))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
