//! Per-user critical sections

use dashmap::DashMap;
use namehist_core::UserId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per user
///
/// Updates for the same user are serialized; different users never
/// contend. Entries live as long as the table, like the records they guard.
#[derive(Debug, Default)]
pub struct UserLocks {
    inner: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`
    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let mutex = self.inner.entry(user_id).or_default().clone();
        mutex.lock_owned().await
    }

    /// Number of users that have been locked at least once
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_exclusive() {
        let locks = UserLocks::new();
        let guard = locks.lock(UserId(1)).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(UserId(1))).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.lock(UserId(1))).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new();
        let _a = locks.lock(UserId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(UserId(2))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
