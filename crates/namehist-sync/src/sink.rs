//! Outbound message operations
//!
//! The chat platform is reached only through [`MessageSink`]. A message that
//! no longer exists is reported as [`SinkError::NotFound`], never as a
//! generic failure, so the reconciler can recover from it.

use async_trait::async_trait;
use namehist_core::{ArtifactRef, ChannelId, MessageContent, MessageId};

/// Errors from message operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The addressed message does not exist (deleted out of band)
    #[error("message not found")]
    NotFound,

    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Platform answered with an error status
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Response could not be understood
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl SinkError {
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Check if a later attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::NotFound | Self::Protocol(_) => false,
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Create, fetch and edit history messages on the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Post a new message in `channel`
    async fn create_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageId, SinkError>;

    /// Read back an existing message
    async fn fetch_message(&self, artifact: ArtifactRef) -> Result<MessageContent, SinkError>;

    /// Replace the content of an existing message
    async fn edit_message(
        &self,
        artifact: ArtifactRef,
        content: &MessageContent,
    ) -> Result<(), SinkError>;
}
