//! Provisioning plan types.
//!
//! A [`ProvisionPlan`] describes everything that has to exist for a cluster:
//! the worker instance role with its policy attachments, the cluster itself
//! and, for caller-managed topologies, a separate node group.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::InstanceType;

/// Service principal trusted by the worker instance role.
pub const TRUSTED_SERVICE: &str = "ec2.amazonaws.com";

/// Managed policies attached to the worker instance role, in attachment order.
pub const MANAGED_POLICY_ARNS: [&str; 3] = [
    "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy",
    "arn:aws:iam::aws:policy/AmazonEKS_CNI_Policy",
    "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly",
];

/// Label placed on caller-managed node groups.
pub const CUSTOM_NODE_GROUP_LABEL: &str = "customNodeGroup";

/// Placeholder used for values only known once the VPC exists.
pub const KNOWN_AFTER_APPLY: &str = "(known after apply)";

/// Network the cluster is placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// VPC identifier.
    pub vpc_id: String,
    /// Subnets, private ones first.
    pub subnet_ids: Vec<String>,
}

impl NetworkContext {
    /// Creates a network context.
    #[must_use]
    pub fn new(vpc_id: impl Into<String>, subnet_ids: Vec<String>) -> Self {
        Self {
            vpc_id: vpc_id.into(),
            subnet_ids,
        }
    }

    /// A network whose identifiers are not known yet, used for previews.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            vpc_id: String::from(KNOWN_AFTER_APPLY),
            subnet_ids: Vec::new(),
        }
    }
}

/// A managed policy attachment, named so repeated runs converge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAttachment {
    /// Attachment name, `<role>-policy-<n>`.
    pub name: String,
    /// ARN of the managed policy.
    pub policy_arn: String,
}

/// Worker instance role and its policy attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePlan {
    /// Role name.
    pub name: String,
    /// Service principal allowed to assume the role.
    pub trusted_service: String,
    /// Attachments, in the order they must be made.
    pub attachments: Vec<PolicyAttachment>,
}

impl RolePlan {
    /// Builds the instance role plan for worker nodes.
    #[must_use]
    pub fn for_worker_nodes(name: &str) -> Self {
        let attachments = MANAGED_POLICY_ARNS
            .iter()
            .enumerate()
            .map(|(counter, arn)| PolicyAttachment {
                name: format!("{name}-policy-{counter}"),
                policy_arn: (*arn).to_string(),
            })
            .collect();

        Self {
            name: name.to_string(),
            trusted_service: String::from(TRUSTED_SERVICE),
            attachments,
        }
    }
}

/// Sizing of the node group the provider creates along with the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultNodeGroupPlan {
    /// Node count at creation.
    pub desired_capacity: i64,
    /// Instance profile used by the nodes.
    pub instance_profile_name: String,
    /// Node instance type.
    pub instance_type: InstanceType,
    /// Minimum node count.
    pub min_size: i64,
    /// Maximum node count.
    pub max_size: i64,
}

/// The EKS cluster resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPlan {
    /// Cluster name.
    pub name: String,
    /// Control plane log types to enable.
    pub enabled_cluster_log_types: Vec<String>,
    /// Private API endpoint access.
    pub endpoint_private_access: bool,
    /// Public API endpoint access.
    pub endpoint_public_access: bool,
    /// Whether Fargate is enabled.
    pub fargate: bool,
    /// Whether nodes get public IPs.
    pub node_associate_public_ip_address: bool,
    /// VPC the cluster lives in.
    pub vpc_id: String,
    /// Subnets the cluster spans.
    pub subnet_ids: Vec<String>,
    /// Names of the instance roles allowed to join.
    pub instance_roles: Vec<String>,
    /// Whether the default node group is skipped.
    pub skip_default_node_group: bool,
    /// Kubernetes version.
    pub version: String,
    /// Whether to deploy the Kubernetes dashboard.
    pub deploy_dashboard: bool,
    /// Default node group sizing, absent when node groups are caller-managed.
    pub default_node_group: Option<DefaultNodeGroupPlan>,
}

/// Instance profile wrapping the worker role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProfilePlan {
    /// Profile name.
    pub name: String,
    /// Role placed in the profile.
    pub role_name: String,
}

/// A caller-managed node group created after the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroupPlan {
    /// Node group name.
    pub name: String,
    /// Node instance type.
    pub instance_type: InstanceType,
    /// Node count at creation.
    pub desired_capacity: i64,
    /// Minimum node count.
    pub min_size: i64,
    /// Maximum node count.
    pub max_size: i64,
    /// Kubernetes labels placed on every node.
    pub labels: BTreeMap<String, String>,
    /// Instance profile built from the worker role.
    pub instance_profile: InstanceProfilePlan,
    /// Kubernetes version.
    pub version: String,
    /// AMI the nodes boot from.
    pub ami_id: String,
}

/// The two mutually exclusive cluster topologies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// The provider creates and manages the node group with the cluster.
    DefaultNodeGroup {
        /// Cluster carrying default node group sizing.
        cluster: ClusterPlan,
    },
    /// The cluster is created bare and a node group is added afterwards.
    CustomNodeGroup {
        /// Cluster without default node group sizing.
        cluster: ClusterPlan,
        /// Node group created once the cluster exists.
        node_group: NodeGroupPlan,
    },
}

/// A complete provisioning plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionPlan {
    /// Configuration hash this plan is based on.
    pub config_hash: String,
    /// Worker instance role.
    pub role: RolePlan,
    /// Selected topology.
    pub topology: Topology,
}

/// Kind of resource a plan step touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// IAM role.
    Role,
    /// IAM role policy attachment.
    PolicyAttachment,
    /// EKS cluster.
    Cluster,
    /// IAM instance profile.
    InstanceProfile,
    /// EKS node group.
    NodeGroup,
}

/// A single, ordered step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Short description of the resource.
    pub detail: String,
}

impl ProvisionPlan {
    /// Returns the cluster plan.
    #[must_use]
    pub const fn cluster(&self) -> &ClusterPlan {
        match &self.topology {
            Topology::DefaultNodeGroup { cluster } | Topology::CustomNodeGroup { cluster, .. } => {
                cluster
            }
        }
    }

    /// Returns the caller-managed node group plan, if any.
    #[must_use]
    pub const fn node_group(&self) -> Option<&NodeGroupPlan> {
        match &self.topology {
            Topology::DefaultNodeGroup { .. } => None,
            Topology::CustomNodeGroup { node_group, .. } => Some(node_group),
        }
    }

    /// Returns true if node groups are managed by the caller.
    #[must_use]
    pub const fn is_custom_node_group(&self) -> bool {
        matches!(self.topology, Topology::CustomNodeGroup { .. })
    }

    /// Returns the steps of the plan in execution order.
    #[must_use]
    pub fn steps(&self) -> Vec<PlanStep> {
        let mut steps = vec![PlanStep {
            kind: ResourceKind::Role,
            name: self.role.name.clone(),
            detail: format!("trusts {}", self.role.trusted_service),
        }];

        steps.extend(self.role.attachments.iter().map(|a| PlanStep {
            kind: ResourceKind::PolicyAttachment,
            name: a.name.clone(),
            detail: a.policy_arn.clone(),
        }));

        let cluster = self.cluster();
        let cluster_detail = cluster.default_node_group.as_ref().map_or_else(
            || format!("v{}, node groups managed separately", cluster.version),
            |group| {
                format!(
                    "v{}, default node group {}x {} ({}-{})",
                    cluster.version,
                    group.desired_capacity,
                    group.instance_type,
                    group.min_size,
                    group.max_size
                )
            },
        );
        steps.push(PlanStep {
            kind: ResourceKind::Cluster,
            name: cluster.name.clone(),
            detail: cluster_detail,
        });

        if let Some(group) = self.node_group() {
            steps.push(PlanStep {
                kind: ResourceKind::InstanceProfile,
                name: group.instance_profile.name.clone(),
                detail: format!("role {}", group.instance_profile.role_name),
            });
            steps.push(PlanStep {
                kind: ResourceKind::NodeGroup,
                name: group.name.clone(),
                detail: format!(
                    "{}x {} ({}-{}), ami {}",
                    group.desired_capacity,
                    group.instance_type,
                    group.min_size,
                    group.max_size,
                    group.ami_id
                ),
            });
        }

        steps
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Role => "role",
            Self::PolicyAttachment => "policy-attachment",
            Self::Cluster => "cluster",
            Self::InstanceProfile => "instance-profile",
            Self::NodeGroup => "node-group",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for PlanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

impl fmt::Display for ProvisionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps = self.steps();
        writeln!(f, "Provision Plan ({} steps):", steps.len())?;
        for (i, step) in steps.iter().enumerate() {
            writeln!(f, "  {}. {step}", i + 1)?;
        }
        Ok(())
    }
}
