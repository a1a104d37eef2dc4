//! Topology resolution.
//!
//! Turns a validated [`ClusterConfig`] and the network it will live in into a
//! [`ProvisionPlan`]. This is pure planning: nothing is created here and
//! nothing is retried.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{keys, ClusterConfig, ConfigHasher, InstanceType};
use crate::error::{ConfigError, DeployError, Result};

use super::plan::{
    ClusterPlan, DefaultNodeGroupPlan, InstanceProfilePlan, NetworkContext, NodeGroupPlan,
    ProvisionPlan, RolePlan, Topology, CUSTOM_NODE_GROUP_LABEL,
};

/// Chooses and parameterizes the cluster topology.
#[derive(Debug, Default)]
pub struct TopologyResolver {
    hasher: ConfigHasher,
}

impl TopologyResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Resolves the provisioning plan for `config`.
    ///
    /// The configuration must have passed validation first.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance type was never resolved, which only
    /// happens for configurations that failed validation.
    pub fn resolve(&self, config: &ClusterConfig, network: &NetworkContext) -> Result<ProvisionPlan> {
        let instance_type = resolved_instance_type(config)?;
        let role = RolePlan::for_worker_nodes(&config.role_name);

        let topology = if config.skip_default_node_group {
            debug!(cluster = %config.cluster_name, "Resolving caller-managed node group topology");
            let cluster = shared_cluster_plan(config, network, &role, None);
            let node_group = node_group_plan(config, &role, instance_type);
            Topology::CustomNodeGroup { cluster, node_group }
        } else {
            debug!(cluster = %config.cluster_name, "Resolving default node group topology");
            let default_node_group = DefaultNodeGroupPlan {
                desired_capacity: config.initial_nodes,
                instance_profile_name: config.instance_profile_name.clone(),
                instance_type,
                min_size: config.min_nodes,
                max_size: config.max_nodes,
            };
            let cluster = shared_cluster_plan(config, network, &role, Some(default_node_group));
            Topology::DefaultNodeGroup { cluster }
        };

        Ok(ProvisionPlan {
            config_hash: self.hasher.hash_config(config),
            role,
            topology,
        })
    }
}

fn resolved_instance_type(config: &ClusterConfig) -> Result<InstanceType> {
    config.instance_type.ok_or_else(|| {
        DeployError::Config(ConfigError::invalid(
            keys::INSTANCE_TYPE,
            "a supported instance type",
            config.instance_type_name.clone(),
        ))
    })
}

fn shared_cluster_plan(
    config: &ClusterConfig,
    network: &NetworkContext,
    role: &RolePlan,
    default_node_group: Option<DefaultNodeGroupPlan>,
) -> ClusterPlan {
    ClusterPlan {
        name: config.cluster_name.clone(),
        enabled_cluster_log_types: config.enabled_log_types(),
        endpoint_private_access: config.private_endpoint,
        endpoint_public_access: config.public_endpoint,
        fargate: config.fargate,
        node_associate_public_ip_address: config.create_public_ips,
        vpc_id: network.vpc_id.clone(),
        subnet_ids: network.subnet_ids.clone(),
        instance_roles: vec![role.name.clone()],
        skip_default_node_group: config.skip_default_node_group,
        version: config.kubernetes_version.clone(),
        deploy_dashboard: config.use_dashboard,
        default_node_group,
    }
}

fn node_group_plan(
    config: &ClusterConfig,
    role: &RolePlan,
    instance_type: InstanceType,
) -> NodeGroupPlan {
    NodeGroupPlan {
        name: config.node_group_name.clone(),
        instance_type,
        desired_capacity: config.initial_nodes,
        min_size: config.min_nodes,
        max_size: config.max_nodes,
        labels: BTreeMap::from([(String::from(CUSTOM_NODE_GROUP_LABEL), String::from("true"))]),
        instance_profile: InstanceProfilePlan {
            name: config.instance_profile_name.clone(),
            role_name: role.name.clone(),
        },
        version: config.kubernetes_version.clone(),
        ami_id: config.ami_id.clone(),
    }
}
