//! File-backed history store.
//!
//! ## Storage layout
//!
//! User ids are opaque and may contain characters that are unsafe in paths, so each user is
//! keyed by the SHA-256 of their id (64 lowercase hex characters) and sharded like this:
//!
//! ```text
//! <history_dir>/
//!   <h[0..2]>/
//!     <h[2..4]>/
//!       <h>/
//!         history.json    # JSON array of analyses, newest first
//! ```
//!
//! Each rewrite of `history.json` happens under two locks: an in-process async mutex per user,
//! which queues tasks of this store, and an exclusive OS lock on `history.lock` in the same
//! directory, which serialises writers in other processes sharing the directory (the CLI and
//! the server, for example). Writes go to a temporary file that is then renamed over
//! `history.json`, so readers see either the old or the new history and an abandoned write
//! never leaves a partial file in place.

use super::HistoryStore;
use crate::analysis::AnalysisResult;
use crate::constants::{HISTORY_FILENAME, HISTORY_LOCK_FILENAME};
use crate::error::StoreError;
use async_trait::async_trait;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

type UserLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug)]
pub struct FileHistoryStore {
    root: PathBuf,
    // Only users with a write in flight have an entry.
    user_locks: Mutex<HashMap<String, UserLock>>,
}

impl FileHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sharded directory holding `user_id`'s history.
    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(user_id.as_bytes()));
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(&digest)
    }

    fn history_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(HISTORY_FILENAME)
    }

    fn acquire_user_lock(&self, user_id: &str) -> UserLock {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id.to_string()).or_default().clone()
    }

    /// Drops the map entry for `user_id` once no other task holds or waits on it.
    fn release_user_lock(&self, user_id: &str, lock: &UserLock) {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in `lock`.
        if Arc::strong_count(lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Opens `history.lock` in `dir` and blocks until it is held exclusively. The lock is
    /// released when the returned file is dropped.
    async fn lock_dir(dir: &Path) -> Result<File, StoreError> {
        let path = dir.join(HISTORY_LOCK_FILENAME);
        tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| StoreError::FileLock(std::io::Error::other(e)))?
        .map_err(StoreError::FileLock)
    }

    async fn read_entries(path: &Path) -> Result<Vec<AnalysisResult>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(StoreError::Deserialization),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::FileRead(e)),
        }
    }

    async fn rewrite(&self, user_id: &str, result: AnalysisResult) -> Result<(), StoreError> {
        let dir = self.user_dir(user_id);
        let path = dir.join(HISTORY_FILENAME);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StoreError::DirCreation)?;
        let _file_lock = Self::lock_dir(&dir).await?;

        let mut entries = Self::read_entries(&path).await?;
        entries.insert(0, result);
        let raw = serde_json::to_vec_pretty(&entries).map_err(StoreError::Serialization)?;

        let tmp = dir.join(format!("{HISTORY_FILENAME}.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &raw)
            .await
            .map_err(StoreError::FileWrite)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::FileWrite(e));
        }

        tracing::debug!(path = %path.display(), entries = entries.len(), "history written");
        Ok(())
    }
}

/// Releases the per-user map entry when dropped, including when `prepend` is abandoned.
struct UserLease<'a> {
    store: &'a FileHistoryStore,
    user_id: &'a str,
    lock: UserLock,
}

impl Drop for UserLease<'_> {
    fn drop(&mut self) {
        self.store.release_user_lock(self.user_id, &self.lock);
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self, user_id: &str) -> Result<Vec<AnalysisResult>, StoreError> {
        Self::read_entries(&self.history_path(user_id)).await
    }

    async fn prepend(&self, user_id: &str, result: AnalysisResult) -> Result<(), StoreError> {
        let lease = UserLease {
            store: self,
            user_id,
            lock: self.acquire_user_lock(user_id),
        };
        let _guard = lease.lock.lock().await;
        self.rewrite(user_id, result).await
    }
}
