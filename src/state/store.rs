//! State store trait definition.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::ProvisionState;
use crate::error::Result;

/// Where provisioning state and the apply lock are kept.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the provisioning state, or `None` before the first apply.
    async fn load(&self) -> Result<Option<ProvisionState>>;

    /// Persists the provisioning state.
    async fn save(&self, state: &ProvisionState) -> Result<()>;

    /// Whether any state has been persisted.
    async fn exists(&self) -> Result<bool>;

    /// Locks the state for an apply of `cluster`.
    ///
    /// Fails with `LockedByOther` while another live process holds the lock.
    async fn acquire_lock(&self, cluster: &str) -> Result<LockInfo>;

    /// Releases a lock. Releasing a lock that was already replaced is a no-op.
    async fn release_lock(&self, lock: &LockInfo) -> Result<()>;

    /// The lock currently in force, ignoring stale ones.
    async fn current_lock(&self) -> Result<Option<LockInfo>>;

    /// Backend name for logs.
    fn backend_type(&self) -> &'static str;
}
