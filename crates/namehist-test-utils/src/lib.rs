//! Testing utilities for the name history workspace
//!
//! Shared fakes and fixtures:
//! - [`RecordingSink`]: in-memory message sink with failure injection
//! - [`FlakyStore`]: record store whose writes can be made to fail
//! - record and ledger builders

#![allow(missing_docs)]

use async_trait::async_trait;
use indexmap::IndexMap;
use namehist_core::{ArtifactRef, ChannelId, MessageContent, MessageId, UserId, UserRecord};
use namehist_store::{MemoryStore, RecordStore, StoreError};
use namehist_sync::{LedgerSettings, MessageSink, NameLedger, SinkError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// First message id handed out by [`RecordingSink`]
pub const FIRST_MESSAGE_ID: u64 = 1_000;

/// A call made against [`RecordingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Create(ChannelId),
    Fetch(ArtifactRef),
    Edit(ArtifactRef),
}

#[derive(Debug)]
struct SinkState {
    next_id: u64,
    messages: IndexMap<ArtifactRef, MessageContent>,
    calls: Vec<SinkCall>,
    fail_create_for: HashSet<String>,
    fail_all: Option<SinkError>,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            next_id: FIRST_MESSAGE_ID,
            messages: IndexMap::new(),
            calls: Vec::new(),
            fail_create_for: HashSet::new(),
            fail_all: None,
        }
    }
}

/// In-memory [`MessageSink`] that records every call
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<SinkState>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every message creation for `user_id` fail
    pub fn fail_creates_for(&self, user_id: UserId) {
        self.state.lock().fail_create_for.insert(user_id.to_string());
    }

    /// Make every call fail with `error` until cleared with `None`
    pub fn fail_all(&self, error: Option<SinkError>) {
        self.state.lock().fail_all = error;
    }

    /// Delete a message behind the ledger's back
    pub fn delete(&self, artifact: ArtifactRef) -> bool {
        self.state.lock().messages.shift_remove(&artifact).is_some()
    }

    /// Current content of a live message
    #[must_use]
    pub fn message(&self, artifact: ArtifactRef) -> Option<MessageContent> {
        self.state.lock().messages.get(&artifact).cloned()
    }

    /// Live messages in `channel`
    #[must_use]
    pub fn messages_in(&self, channel: ChannelId) -> Vec<(ArtifactRef, MessageContent)> {
        self.state
            .lock()
            .messages
            .iter()
            .filter(|(r, _)| r.is_in(channel))
            .map(|(r, c)| (*r, c.clone()))
            .collect()
    }

    /// Live messages in `channel` rendered for `user_id`
    #[must_use]
    pub fn messages_for(&self, channel: ChannelId, user_id: UserId) -> Vec<ArtifactRef> {
        let id = user_id.to_string();
        self.messages_in(channel)
            .into_iter()
            .filter(|(_, c)| c.field("User ID") == Some(id.as_str()))
            .map(|(r, _)| r)
            .collect()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Create(_)))
    }

    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Edit(_)))
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn create_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> Result<MessageId, SinkError> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Create(channel));
        if let Some(err) = state.fail_all.clone() {
            return Err(err);
        }
        if content
            .field("User ID")
            .is_some_and(|id| state.fail_create_for.contains(id))
        {
            return Err(SinkError::rejected(500, "injected create failure"));
        }

        let message = MessageId(state.next_id);
        state.next_id += 1;
        state
            .messages
            .insert(ArtifactRef::new(channel, message), content.clone());
        Ok(message)
    }

    async fn fetch_message(&self, artifact: ArtifactRef) -> Result<MessageContent, SinkError> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Fetch(artifact));
        if let Some(err) = state.fail_all.clone() {
            return Err(err);
        }
        state
            .messages
            .get(&artifact)
            .cloned()
            .ok_or(SinkError::NotFound)
    }

    async fn edit_message(
        &self,
        artifact: ArtifactRef,
        content: &MessageContent,
    ) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        state.calls.push(SinkCall::Edit(artifact));
        if let Some(err) = state.fail_all.clone() {
            return Err(err);
        }
        match state.messages.get_mut(&artifact) {
            Some(existing) => {
                *existing = content.clone();
                Ok(())
            }
            None => Err(SinkError::NotFound),
        }
    }
}

/// In-memory store whose writes fail while switched off
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    writes_left: Mutex<Option<usize>>,
}

impl FlakyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let `count` more writes succeed, then fail every write after them
    pub fn fail_after_writes(&self, count: usize) {
        *self.writes_left.lock() = Some(count);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        let mut writes_left = self.writes_left.lock();
        match *writes_left {
            Some(0) => Err(StoreError::Unavailable("write budget exhausted".into())),
            Some(left) => {
                *writes_left = Some(left - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.inner.get(user_id).await
    }

    async fn put(&self, record: UserRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner.put(record).await
    }

    async fn all(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.all().await
    }

    async fn destination(&self) -> Result<Option<ChannelId>, StoreError> {
        self.inner.destination().await
    }

    async fn set_destination(&self, destination: ChannelId) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner.set_destination(destination).await
    }
}

/// A ledger over a fresh [`MemoryStore`] and [`RecordingSink`]
#[must_use]
pub fn memory_ledger(
    settings: LedgerSettings,
) -> (NameLedger, Arc<MemoryStore>, Arc<RecordingSink>) {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let ledger = NameLedger::with_settings(store.clone(), sink.clone(), settings);
    (ledger, store, sink)
}

/// Record for `user_id` named `user-{id}` with one past name
#[must_use]
pub fn sample_record(user_id: u64) -> UserRecord {
    UserRecord::new(UserId(user_id), format!("user-{user_id}"))
        .with_past_names([format!("old-{user_id}")])
}

/// Insert `count` sample records with ids `1..=count`
pub async fn seed_records(store: &dyn RecordStore, count: u64) -> Result<(), StoreError> {
    for id in 1..=count {
        store.put(sample_record(id)).await?;
    }
    Ok(())
}
