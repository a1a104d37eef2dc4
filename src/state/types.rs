//! State types for tracking provisioned resources.
//!
//! These types record what a provisioner has created so that repeated runs
//! converge instead of creating duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Maximum number of history entries kept.
const MAX_HISTORY: usize = 100;

/// Everything a provisioner has recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionState {
    /// State format version.
    pub version: String,
    /// Hash of the last applied configuration.
    #[serde(default)]
    pub config_hash: String,
    /// VPCs by name.
    #[serde(default)]
    pub vpcs: BTreeMap<String, VpcRecord>,
    /// IAM roles by name.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleRecord>,
    /// Policy attachments by attachment name.
    #[serde(default)]
    pub attachments: BTreeMap<String, AttachmentRecord>,
    /// Instance profiles by name.
    #[serde(default)]
    pub instance_profiles: BTreeMap<String, InstanceProfileRecord>,
    /// Clusters by name.
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterRecord>,
    /// Node groups by `<cluster>/<node group>`.
    #[serde(default)]
    pub node_groups: BTreeMap<String, NodeGroupRecord>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Recent resource changes, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// A recorded VPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcRecord {
    /// VPC name.
    pub name: String,
    /// VPC identifier.
    pub vpc_id: String,
    /// Private subnets.
    pub private_subnet_ids: Vec<String>,
    /// Public subnets.
    pub public_subnet_ids: Vec<String>,
    /// When the VPC was created.
    pub created_at: DateTime<Utc>,
}

/// A recorded IAM role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Role name.
    pub name: String,
    /// Role ARN.
    pub arn: String,
    /// Service principal in the trust policy.
    pub trusted_service: String,
    /// When the role was created.
    pub created_at: DateTime<Utc>,
}

/// A recorded managed policy attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Attachment name.
    pub name: String,
    /// Role the policy is attached to.
    pub role_name: String,
    /// Attached policy.
    pub policy_arn: String,
    /// When the attachment was made.
    pub created_at: DateTime<Utc>,
}

/// A recorded instance profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceProfileRecord {
    /// Profile name.
    pub name: String,
    /// Profile ARN.
    pub arn: String,
    /// Role held by the profile.
    pub role_name: String,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

/// A recorded cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Cluster name.
    pub name: String,
    /// Cluster ARN.
    pub arn: String,
    /// API server endpoint.
    pub endpoint: String,
    /// Certificate authority data.
    pub certificate_authority: String,
    /// Hash of the cluster spec last applied.
    pub spec_hash: String,
    /// When the cluster was created.
    pub created_at: DateTime<Utc>,
    /// When the cluster was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A recorded node group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroupRecord {
    /// Node group name.
    pub name: String,
    /// Cluster the node group belongs to.
    pub cluster_name: String,
    /// Instance profile the nodes run with.
    pub instance_profile: String,
    /// Hash of the node group spec last applied.
    pub spec_hash: String,
    /// When the node group was created.
    pub created_at: DateTime<Utc>,
    /// When the node group was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A single entry in the change history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub operation: ResourceOperation,
    /// Resource type, e.g. `cluster`.
    pub resource_type: String,
    /// Resource name.
    pub name: String,
}

/// Types of recorded changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperation {
    /// The resource was created.
    Create,
    /// The resource was updated in place.
    Update,
}

impl ProvisionState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            config_hash: String::new(),
            vpcs: BTreeMap::new(),
            roles: BTreeMap::new(),
            attachments: BTreeMap::new(),
            instance_profiles: BTreeMap::new(),
            clusters: BTreeMap::new(),
            node_groups: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Key under which a node group is recorded.
    #[must_use]
    pub fn node_group_key(cluster_name: &str, node_group_name: &str) -> String {
        format!("{cluster_name}/{node_group_name}")
    }

    /// Records a change and bumps the update timestamp.
    pub fn record(&mut self, operation: ResourceOperation, resource_type: &str, name: &str) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(HistoryEntry {
            timestamp: Utc::now(),
            operation,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
        });
        self.last_updated = Utc::now();
    }

    /// Total number of recorded resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.vpcs.len()
            + self.roles.len()
            + self.attachments.len()
            + self.instance_profiles.len()
            + self.clusters.len()
            + self.node_groups.len()
    }
}

impl Default for ProvisionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Create => "create",
            Self::Update => "update",
        };
        write!(f, "{op}")
    }
}
