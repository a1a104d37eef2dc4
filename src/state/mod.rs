//! State management module.
//!
//! This module provides persistent state storage for tracking provisioned
//! resources, so that re-running a deployment converges instead of
//! duplicating infrastructure.

mod local;
mod lock;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{holder_id, LockInfo, LOCK_EXPIRY_SECS};
pub use store::StateStore;
pub use types::{
    AttachmentRecord, ClusterRecord, HistoryEntry, InstanceProfileRecord, NodeGroupRecord,
    ProvisionState, ResourceOperation, RoleRecord, VpcRecord, STATE_VERSION,
};
