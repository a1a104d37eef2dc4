//! The provisioner seam.
//!
//! Everything that actually creates infrastructure goes through
//! [`Provisioner`]. Implementations own their own retry and timeout
//! behaviour; callers propagate their errors unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::planner::{
    ClusterPlan, InstanceProfilePlan, NetworkContext, NodeGroupPlan, PolicyAttachment, RolePlan,
};

/// An IAM role that exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Role ARN.
    pub arn: String,
}

/// An IAM instance profile that exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProfile {
    /// Profile name.
    pub name: String,
    /// Profile ARN.
    pub arn: String,
    /// Role held by the profile.
    pub role_name: String,
}

/// A cluster that exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHandle {
    /// Cluster name.
    pub name: String,
    /// Cluster ARN.
    pub arn: String,
    /// API server endpoint.
    pub endpoint: String,
    /// Base64 encoded certificate authority data.
    pub certificate_authority: String,
    /// The cluster exists only as a dry-run record and cannot be reached.
    #[serde(default)]
    pub simulated: bool,
}

/// Creates the resources described by a provisioning plan.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Creates (or finds) the VPC and returns the network the cluster uses.
    async fn create_vpc(&self, name: &str) -> Result<NetworkContext>;

    /// Creates the role with a trust policy for the planned service.
    async fn create_role(&self, plan: &RolePlan) -> Result<Role>;

    /// Attaches a managed policy. Attaching under an existing name converges.
    async fn attach_policy(&self, role: &Role, attachment: &PolicyAttachment) -> Result<()>;

    /// Creates an instance profile wrapping `role`.
    async fn create_instance_profile(
        &self,
        plan: &InstanceProfilePlan,
        role: &Role,
    ) -> Result<InstanceProfile>;

    /// Creates the cluster.
    async fn create_cluster(&self, plan: &ClusterPlan, role: &Role) -> Result<ClusterHandle>;

    /// Creates a node group in an existing cluster.
    async fn create_node_group(
        &self,
        cluster: &ClusterHandle,
        plan: &NodeGroupPlan,
        profile: &InstanceProfile,
    ) -> Result<()>;

    /// Gets the provisioner name, used in logs.
    fn provisioner_type(&self) -> &'static str;
}
