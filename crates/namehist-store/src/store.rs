//! Record store contract and implementations

use crate::error::StoreError;
use crate::snapshot::StoreSnapshot;
use async_trait::async_trait;
use namehist_core::{ChannelId, UserId, UserRecord};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Durable key-value storage of user records and the destination
///
/// # Guarantees
/// - `put` replaces a whole record; a concurrent `get` sees either the old
///   or the new record, never a mix
/// - a failed write leaves the store exactly as it was
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Fetch the record of `user_id`
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Insert or replace the record filed under `record.user_id`
    async fn put(&self, record: UserRecord) -> Result<(), StoreError>;

    /// All records in enumeration order
    async fn all(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Current destination, if configured
    async fn destination(&self) -> Result<Option<ChannelId>, StoreError>;

    /// Replace the destination
    async fn set_destination(&self, destination: ChannelId) -> Result<(), StoreError>;

    /// Number of stored records
    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.all().await?.len())
    }
}

/// Volatile in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current contents
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.state.read().users.get(&user_id).cloned())
    }

    async fn put(&self, record: UserRecord) -> Result<(), StoreError> {
        self.state.write().upsert(record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.state.read().users.values().cloned().collect())
    }

    async fn destination(&self) -> Result<Option<ChannelId>, StoreError> {
        Ok(self.state.read().destination)
    }

    async fn set_destination(&self, destination: ChannelId) -> Result<(), StoreError> {
        self.state.write().destination = Some(destination);
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().users.len())
    }
}

/// Store persisted as a single JSON document
///
/// The document is loaded fully on [`open`](Self::open) and rewritten after
/// every mutation. Writes go to a sibling `.tmp` file which is then renamed
/// over the target, so the file on disk is always a complete snapshot.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreSnapshot>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file is absent
    ///
    /// # Errors
    /// - `StoreError::Io` if the file or its directory cannot be accessed
    /// - `StoreError::Corrupt` if the file does not hold a valid snapshot
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io_error(parent, e))?;
        }

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreSnapshot::default(),
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::corrupt(&path, e.to_string()))?;
                snapshot
                    .validate()
                    .map_err(|message| StoreError::corrupt(&path, message))?;
                snapshot
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };

        tracing::info!(
            path = %path.display(),
            users = snapshot.users.len(),
            destination = ?snapshot.destination,
            "Opened record store"
        );

        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().await.clone()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.temp_path();

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))?;

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = sync_dir(dir).await {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to sync store directory");
            }
        }
        Ok(())
    }
}

/// Flush a directory entry so a completed rename survives a crash
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn put(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let user_id = record.user_id;
        let undo = state.upsert(record);

        if let Err(e) = self.persist(&state).await {
            state.undo(undo);
            tracing::error!(%user_id, error = %e, "Failed to persist record");
            return Err(e);
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.state.lock().await.users.values().cloned().collect())
    }

    async fn destination(&self) -> Result<Option<ChannelId>, StoreError> {
        Ok(self.state.lock().await.destination)
    }

    async fn set_destination(&self, destination: ChannelId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let previous = state.destination.replace(destination);

        if let Err(e) = self.persist(&state).await {
            state.destination = previous;
            tracing::error!(%destination, error = %e, "Failed to persist destination");
            return Err(e);
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namehist_core::{ArtifactRef, MessageId};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn memory_store_put_get() {
        let store = MemoryStore::new();
        assert!(store.get(UserId(1)).await.unwrap().is_none());

        let record = UserRecord::new(UserId(1), "alice");
        store.put(record.clone()).await.unwrap();
        assert_eq!(store.get(UserId(1)).await.unwrap(), Some(record));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn memory_store_replace_keeps_order() {
        let store = MemoryStore::new();
        store.put(UserRecord::new(UserId(2), "b")).await.unwrap();
        store.put(UserRecord::new(UserId(1), "a")).await.unwrap();
        store.put(UserRecord::new(UserId(2), "b2")).await.unwrap();

        let names: Vec<_> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.current_name)
            .collect();
        assert_eq!(names, vec!["b2", "a"]);
    }

    #[tokio::test]
    async fn memory_store_destination() {
        let store = MemoryStore::new();
        assert_eq!(store.destination().await.unwrap(), None);
        store.set_destination(ChannelId(5)).await.unwrap();
        assert_eq!(store.destination().await.unwrap(), Some(ChannelId(5)));
    }

    #[tokio::test]
    async fn file_store_temp_path_is_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("state.json")).await.unwrap();
        assert_eq!(store.temp_path(), dir.path().join("state.json.tmp"));
    }

    #[tokio::test]
    async fn file_store_put_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let record = UserRecord::new(UserId(42), "alicia")
            .with_past_names(["alice"])
            .with_artifact(ArtifactRef::new(ChannelId(1), MessageId(2)));
        store.put(record.clone()).await.unwrap();

        let on_disk: StoreSnapshot =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.users.get(&UserId(42)), Some(&record));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn directory_sync_after_rename() {
        let dir = tempfile::tempdir().unwrap();
        sync_dir(dir.path()).await.unwrap();
        assert!(sync_dir(&dir.path().join("missing")).await.is_err() || cfg!(not(unix)));
    }
}
