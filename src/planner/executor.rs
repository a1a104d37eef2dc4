//! Plan executor for provisioning clusters.
//!
//! This module drives a [`Provisioner`] through a resolved plan. Resources
//! are created strictly in dependency order and the first failure aborts the
//! run; errors reach the caller exactly as the provisioner raised them.

use tracing::{debug, info};

use crate::config::{ClusterConfig, ConfigValidator};
use crate::error::Result;
use crate::provision::{ClusterHandle, Kubeconfig, Provisioner};

use super::plan::{NetworkContext, ProvisionPlan, Topology};
use super::resolver::TopologyResolver;

/// Executor for provisioning plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, P: Provisioner + ?Sized> {
    /// Provisioner that creates the resources.
    provisioner: &'a P,
    /// Resolver used to build the plan.
    resolver: TopologyResolver,
}

/// Result of applying a configuration.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Network the cluster was placed in.
    pub network: NetworkContext,
    /// Plan that was applied.
    pub plan: ProvisionPlan,
    /// The created cluster.
    pub cluster: ClusterHandle,
    /// Kubeconfig for the cluster, `None` when it was only recorded.
    pub kubeconfig: Option<Kubeconfig>,
}

impl<'a, P: Provisioner + ?Sized> PlanExecutor<'a, P> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(provisioner: &'a P) -> Self {
        Self {
            provisioner,
            resolver: TopologyResolver::new(),
        }
    }

    /// Provisions everything `config` describes.
    ///
    /// Invalid configurations are refused before the provisioner is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, or the first error raised while
    /// resolving or provisioning.
    pub async fn apply(&self, config: &ClusterConfig) -> Result<ApplyOutcome> {
        let recommendations = ConfigValidator::new().validate(config).into_result()?;
        debug!("{} recommendations outstanding", recommendations.len());

        info!(
            "Applying cluster '{}' with {} provisioner",
            config.cluster_name,
            self.provisioner.provisioner_type()
        );

        let network = self.provisioner.create_vpc(&config.vpc_name).await?;
        debug!(
            "VPC {} ready with {} subnets",
            network.vpc_id,
            network.subnet_ids.len()
        );

        let plan = self.resolver.resolve(config, &network)?;
        let cluster = self.execute(&plan).await?;
        let kubeconfig = Kubeconfig::for_cluster(&cluster);

        if cluster.simulated {
            info!("Cluster '{}' recorded, nothing was created", cluster.name);
        } else {
            info!("Cluster '{}' provisioned", cluster.name);
        }

        Ok(ApplyOutcome {
            network,
            plan,
            cluster,
            kubeconfig,
        })
    }

    /// Executes an already resolved plan and returns the cluster.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the provisioner.
    pub async fn execute(&self, plan: &ProvisionPlan) -> Result<ClusterHandle> {
        let role = self.provisioner.create_role(&plan.role).await?;
        info!("Role ready: {}", role.name);

        for attachment in &plan.role.attachments {
            self.provisioner.attach_policy(&role, attachment).await?;
            debug!("Attached {} as {}", attachment.policy_arn, attachment.name);
        }

        let cluster = self.provisioner.create_cluster(plan.cluster(), &role).await?;
        info!("Cluster ready: {}", cluster.name);

        if let Topology::CustomNodeGroup { node_group, .. } = &plan.topology {
            let profile = self
                .provisioner
                .create_instance_profile(&node_group.instance_profile, &role)
                .await?;
            self.provisioner
                .create_node_group(&cluster, node_group, &profile)
                .await?;
            info!("Node group ready: {}", node_group.name);
        }

        Ok(cluster)
    }
}
