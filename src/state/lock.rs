//! Apply lock.
//!
//! An apply writes a lock naming the cluster it is provisioning and the
//! process doing it. A second apply against the same state directory is
//! refused until the lock is released or goes stale.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds after which an unreleased lock is considered abandoned.
pub const LOCK_EXPIRY_SECS: i64 = 300;

/// A held apply lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier, needed to release it.
    pub lock_id: String,
    /// Cluster being provisioned under this lock.
    pub cluster: String,
    /// Process holding the lock (`host-pid-nonce`).
    pub holder: String,
    /// When the lock was taken.
    pub acquired_at: DateTime<Utc>,
    /// When the lock goes stale.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Takes a lock on `cluster` for this process.
    #[must_use]
    pub fn for_cluster(cluster: &str) -> Self {
        Self::held_by(cluster, holder_id())
    }

    /// Takes a lock on `cluster` for an explicit holder.
    #[must_use]
    pub fn held_by(cluster: &str, holder: impl Into<String>) -> Self {
        let acquired_at = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            cluster: cluster.to_string(),
            holder: holder.into(),
            acquired_at,
            expires_at: acquired_at + Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Whether the lock is past its expiry and may be taken over.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Whether the lock was taken by the current process.
    #[must_use]
    pub fn is_own(&self) -> bool {
        parse_holder(&self.holder)
            .is_some_and(|(host, pid)| pid == std::process::id() && host == host_name())
    }
}

/// Splits a `host-pid-nonce` holder into its host and pid. The host may
/// itself contain dashes.
fn parse_holder(holder: &str) -> Option<(&str, u32)> {
    let mut parts = holder.rsplitn(3, '-');
    let _nonce = parts.next()?;
    let pid = parts.next()?.parse().ok()?;
    let host = parts.next()?;
    Some((host, pid))
}

fn host_name() -> String {
    hostname::get().map_or_else(
        |_| String::from("unknown"),
        |h| h.to_string_lossy().into_owned(),
    )
}

/// Identifier for the current process: host name, pid and a short nonce.
#[must_use]
pub fn holder_id() -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", host_name(), std::process::id(), &nonce[..8])
}
