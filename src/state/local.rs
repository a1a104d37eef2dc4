//! Local file-based state storage backend.
//!
//! State lives in `state.json` inside the state directory, next to an
//! `apply.lock` file while an apply is running. The state file is written to
//! a sibling temporary file and renamed into place. The lock file is written
//! to a private file and hard-linked into place, which fails if a lock
//! already exists, so two applies can never both take it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DeployError, Result, StateError};

use super::lock::{LockInfo, LOCK_EXPIRY_SECS};
use super::store::StateStore;
use super::types::{ProvisionState, STATE_VERSION};

/// Default state directory name.
pub const STATE_DIR: &str = ".eksdeploy";

const STATE_FILE: &str = "state.json";
const LOCK_FILE: &str = "apply.lock";

/// Attempts to take the lock when stale locks keep reappearing.
const LOCK_ATTEMPTS: usize = 3;

/// State store backed by a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalStateStore {
    base_dir: PathBuf,
}

impl LocalStateStore {
    /// Creates a store rooted at `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Path of the state file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.base_dir.join(STATE_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.base_dir.join(LOCK_FILE)
    }

    /// Reads and parses a JSON file, `None` if it does not exist.
    async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::corrupted(&format!("cannot read {what}"), e).into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StateError::corrupted(&format!("cannot parse {what}"), e).into())
    }

    /// Serializes `value` and swaps it into `path`.
    async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;

        let content = serde_json::to_vec_pretty(value)
            .map_err(|e| StateError::serialization(e.to_string()))?;

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn read_lock(&self) -> Result<Option<LockInfo>> {
        Self::read_json(&self.lock_path(), "lock file").await
    }

    /// Publishes `lock` as the lock file. Returns false if one already exists.
    async fn create_lock_file(&self, lock: &LockInfo) -> Result<bool> {
        let private = self.base_dir.join(format!("apply-{}.lock", lock.lock_id));
        self.write_json(&private, lock).await?;

        let linked = fs::hard_link(&private, self.lock_path()).await;
        fs::remove_file(&private).await?;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(StateError::lock_failed("cannot create lock file", e).into()),
        }
    }

    /// Moves a stale lock out of the way.
    ///
    /// The file is renamed aside before it is inspected. If it turns out to
    /// be a fresh lock taken since `stale` was read, it is put back and the
    /// apply is refused.
    async fn evict_lock(&self, stale: &LockInfo) -> Result<()> {
        let parked = self
            .base_dir
            .join(format!("evicted-{}.lock", Uuid::new_v4().simple()));

        match fs::rename(self.lock_path(), &parked).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StateError::lock_failed("cannot evict lock file", e).into()),
        }

        let evicted = Self::read_json::<LockInfo>(&parked, "lock file").await?;
        if let Some(fresh) = evicted.filter(|lock| lock.lock_id != stale.lock_id) {
            if let Err(e) = fs::hard_link(&parked, self.lock_path()).await {
                debug!("Lock {} not restored: {e}", fresh.lock_id);
            }
            fs::remove_file(&parked).await?;
            return Err(locked_by(fresh));
        }

        fs::remove_file(&parked).await?;
        Ok(())
    }
}

fn locked_by(lock: LockInfo) -> DeployError {
    StateError::LockedByOther {
        cluster: lock.cluster,
        holder: lock.holder,
        since: lock.acquired_at.to_rfc3339(),
    }
    .into()
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProvisionState>> {
        let path = self.state_path();
        debug!("Loading state from: {}", path.display());

        let Some(state) = Self::read_json::<ProvisionState>(&path, "state file").await? else {
            return Ok(None);
        };

        if state.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }
            .into());
        }

        Ok(Some(state))
    }

    async fn save(&self, state: &ProvisionState) -> Result<()> {
        let path = self.state_path();
        debug!(
            "Saving {} resources to: {}",
            state.resource_count(),
            path.display()
        );
        self.write_json(&path, state).await
    }

    async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(self.state_path()).await?)
    }

    async fn acquire_lock(&self, cluster: &str) -> Result<LockInfo> {
        let lock = LockInfo::for_cluster(cluster);

        for _ in 0..LOCK_ATTEMPTS {
            if self.create_lock_file(&lock).await? {
                info!("Locked state for cluster {cluster} (expires in {LOCK_EXPIRY_SECS}s)");
                return Ok(lock);
            }

            // Released between the failed link and this read.
            let Some(existing) = self.read_lock().await? else {
                continue;
            };
            if !existing.is_stale() && !existing.is_own() {
                return Err(locked_by(existing));
            }

            warn!(
                "Taking over lock {} left by {}",
                existing.lock_id, existing.holder
            );
            self.evict_lock(&existing).await?;
        }

        Err(StateError::lock_failed(
            "cannot take lock file",
            format!("still contended after {LOCK_ATTEMPTS} attempts"),
        )
        .into())
    }

    async fn release_lock(&self, lock: &LockInfo) -> Result<()> {
        match self.read_lock().await? {
            Some(existing) if existing.lock_id == lock.lock_id => {
                fs::remove_file(self.lock_path())
                    .await
                    .map_err(|e| StateError::lock_failed("cannot remove lock file", e))?;
                info!("Released state lock for cluster {}", lock.cluster);
            }
            Some(existing) => debug!(
                "Lock {} was replaced by {}, leaving it in place",
                lock.lock_id, existing.lock_id
            ),
            None => debug!("Lock {} already released", lock.lock_id),
        }
        Ok(())
    }

    async fn current_lock(&self) -> Result<Option<LockInfo>> {
        Ok(self.read_lock().await?.filter(|lock| !lock.is_stale()))
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn store() -> (LocalStateStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = LocalStateStore::with_base_dir(temp.path().join(STATE_DIR));
        (store, temp)
    }

    fn write_lock(store: &LocalStateStore, lock: &LockInfo) {
        std::fs::create_dir_all(&store.base_dir).unwrap();
        std::fs::write(store.lock_path(), serde_json::to_string(lock).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let (store, _temp) = store();
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.exists().await.unwrap());

        let mut state = ProvisionState::new();
        state.config_hash = String::from("abc123");
        store.save(&state).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(loaded.config_hash, "abc123");
        assert_eq!(loaded.version, STATE_VERSION);
        assert!(!store.state_path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupted_state_is_reported() {
        let (store, _temp) = store();
        std::fs::create_dir_all(&store.base_dir).unwrap();
        std::fs::write(store.state_path(), "{not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, DeployError::State(StateError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_reported() {
        let (store, _temp) = store();
        let mut state = ProvisionState::new();
        state.version = String::from("0.1");
        store.save(&state).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::State(StateError::VersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_lock_round_trip() {
        let (store, _temp) = store();

        let lock = store.acquire_lock("main").await.unwrap();
        assert_eq!(store.current_lock().await.unwrap(), Some(lock.clone()));

        store.release_lock(&lock).await.unwrap();
        assert!(store.current_lock().await.unwrap().is_none());
        assert!(!store.lock_path().exists());
    }

    #[tokio::test]
    async fn test_foreign_lock_blocks_apply() {
        let (store, _temp) = store();
        write_lock(&store, &LockInfo::held_by("main", "other-host-0-abcdef01"));

        let err = store.acquire_lock("main").await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::State(StateError::LockedByOther { ref cluster, .. }) if cluster == "main"
        ));
    }

    #[tokio::test]
    async fn test_stale_foreign_lock_is_taken_over() {
        let (store, _temp) = store();
        let mut stale = LockInfo::held_by("main", "other-host-0-abcdef01");
        stale.expires_at = Utc::now() - Duration::seconds(1);
        write_lock(&store, &stale);
        assert!(store.current_lock().await.unwrap().is_none());

        let lock = store.acquire_lock("main").await.unwrap();
        assert_ne!(lock.lock_id, stale.lock_id);
        assert!(lock.is_own());

        let leftovers: Vec<_> = std::fs::read_dir(&store.base_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, [LOCK_FILE]);
    }

    #[tokio::test]
    async fn test_only_one_concurrent_lock_file_wins() {
        let (store, _temp) = store();
        let locks: Vec<LockInfo> = (0..4)
            .map(|i| LockInfo::held_by("main", format!("runner-{i}-0-abcdef01")))
            .collect();

        let (a, b, c, d) = tokio::join!(
            store.create_lock_file(&locks[0]),
            store.create_lock_file(&locks[1]),
            store.create_lock_file(&locks[2]),
            store.create_lock_file(&locks[3]),
        );
        let won: Vec<bool> = [a, b, c, d].into_iter().map(Result::unwrap).collect();

        assert_eq!(won.iter().filter(|w| **w).count(), 1);
        let held = store.current_lock().await.unwrap().unwrap();
        let winner = won.iter().position(|w| *w).unwrap();
        assert_eq!(held.lock_id, locks[winner].lock_id);
    }

    #[tokio::test]
    async fn test_releasing_a_replaced_lock_keeps_the_new_one() {
        let (store, _temp) = store();
        let first = store.acquire_lock("main").await.unwrap();
        let second = store.acquire_lock("main").await.unwrap();

        store.release_lock(&first).await.unwrap();

        assert_eq!(store.current_lock().await.unwrap(), Some(second));
    }
}
