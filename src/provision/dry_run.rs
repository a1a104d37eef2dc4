//! Dry-run provisioner that records resources in local state.
//!
//! Nothing is created in a cloud account. Every resource the plan asks for is
//! written to the state store under its name, so running the same
//! configuration twice converges on the same records, and a changed cluster
//! or node group spec is recorded as an in-place update. Clusters it returns
//! are marked simulated: their endpoint uses the reserved `.invalid` domain
//! and they carry no certificate authority.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ConfigHasher;
use crate::error::{ProvisionError, Result};
use crate::planner::{
    ClusterPlan, InstanceProfilePlan, NetworkContext, NodeGroupPlan, PolicyAttachment, RolePlan,
};
use crate::state::{
    AttachmentRecord, ClusterRecord, InstanceProfileRecord, NodeGroupRecord, ProvisionState,
    ResourceOperation, RoleRecord, StateStore, VpcRecord,
};

use super::provisioner::{ClusterHandle, InstanceProfile, Provisioner, Role};

/// Account id used in generated ARNs.
const ACCOUNT_ID: &str = "000000000000";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Domain of recorded cluster endpoints. `.invalid` never resolves.
pub const DRY_RUN_DOMAIN: &str = "eks.dry-run.invalid";

/// Subnets created per tier.
const SUBNETS_PER_TIER: usize = 2;

/// Record-only provisioner backed by a [`StateStore`].
#[derive(Debug)]
pub struct DryRunProvisioner<S: StateStore> {
    store: S,
    region: String,
    hasher: ConfigHasher,
}

impl<S: StateStore> DryRunProvisioner<S> {
    /// Creates a provisioner that records into `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            region: String::from(DEFAULT_REGION),
            hasher: ConfigHasher::new(),
        }
    }

    /// Sets the region used in generated ARNs and endpoints.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Gets the underlying state store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Loads the recorded state, starting fresh if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read.
    pub async fn state(&self) -> Result<ProvisionState> {
        Ok(self.store.load().await?.unwrap_or_default())
    }

    /// Records the hash of a successfully applied configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be read or written.
    pub async fn mark_applied(&self, config_hash: &str) -> Result<()> {
        let mut state = self.state().await?;
        state.config_hash = config_hash.to_string();
        state.last_updated = Utc::now();
        self.store.save(&state).await
    }

    fn arn(&self, service: &str, resource: &str) -> String {
        let region = if service == "iam" { "" } else { self.region.as_str() };
        format!("arn:aws:{service}:{region}:{ACCOUNT_ID}:{resource}")
    }
}

/// A short random identifier with an AWS style prefix.
fn resource_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..17])
}

fn subnets() -> Vec<String> {
    (0..SUBNETS_PER_TIER).map(|_| resource_id("subnet")).collect()
}

#[async_trait]
impl<S: StateStore> Provisioner for DryRunProvisioner<S> {
    async fn create_vpc(&self, name: &str) -> Result<NetworkContext> {
        let mut state = self.state().await?;

        let vpc = if let Some(existing) = state.vpcs.get(name) {
            debug!("VPC {name} already exists: {}", existing.vpc_id);
            existing.clone()
        } else {
            let vpc = VpcRecord {
                name: name.to_string(),
                vpc_id: resource_id("vpc"),
                private_subnet_ids: subnets(),
                public_subnet_ids: subnets(),
                created_at: Utc::now(),
            };
            info!("Recorded VPC {name}: {}", vpc.vpc_id);
            state.vpcs.insert(name.to_string(), vpc.clone());
            state.record(ResourceOperation::Create, "vpc", name);
            self.store.save(&state).await?;
            vpc
        };

        let subnet_ids = vpc
            .private_subnet_ids
            .iter()
            .chain(&vpc.public_subnet_ids)
            .cloned()
            .collect();

        Ok(NetworkContext::new(vpc.vpc_id, subnet_ids))
    }

    async fn create_role(&self, plan: &RolePlan) -> Result<Role> {
        let mut state = self.state().await?;

        if let Some(existing) = state.roles.get(&plan.name) {
            debug!("Role {} already exists", plan.name);
            return Ok(Role {
                name: existing.name.clone(),
                arn: existing.arn.clone(),
            });
        }

        let record = RoleRecord {
            name: plan.name.clone(),
            arn: self.arn("iam", &format!("role/{}", plan.name)),
            trusted_service: plan.trusted_service.clone(),
            created_at: Utc::now(),
        };
        let role = Role {
            name: record.name.clone(),
            arn: record.arn.clone(),
        };

        info!("Recorded role {} trusting {}", plan.name, plan.trusted_service);
        state.roles.insert(plan.name.clone(), record);
        state.record(ResourceOperation::Create, "role", &plan.name);
        self.store.save(&state).await?;

        Ok(role)
    }

    async fn attach_policy(&self, role: &Role, attachment: &PolicyAttachment) -> Result<()> {
        let mut state = self.state().await?;

        if !state.roles.contains_key(&role.name) {
            return Err(ProvisionError::missing("role", &role.name).into());
        }
        if state.attachments.contains_key(&attachment.name) {
            debug!("Attachment {} already exists", attachment.name);
            return Ok(());
        }

        state.attachments.insert(
            attachment.name.clone(),
            AttachmentRecord {
                name: attachment.name.clone(),
                role_name: role.name.clone(),
                policy_arn: attachment.policy_arn.clone(),
                created_at: Utc::now(),
            },
        );
        state.record(ResourceOperation::Create, "policy-attachment", &attachment.name);
        self.store.save(&state).await?;

        debug!("Attached {} to {}", attachment.policy_arn, role.name);
        Ok(())
    }

    async fn create_instance_profile(
        &self,
        plan: &InstanceProfilePlan,
        role: &Role,
    ) -> Result<InstanceProfile> {
        let mut state = self.state().await?;

        if !state.roles.contains_key(&role.name) {
            return Err(ProvisionError::missing("role", &role.name).into());
        }
        if let Some(existing) = state.instance_profiles.get(&plan.name) {
            debug!("Instance profile {} already exists", plan.name);
            return Ok(InstanceProfile {
                name: existing.name.clone(),
                arn: existing.arn.clone(),
                role_name: existing.role_name.clone(),
            });
        }

        let record = InstanceProfileRecord {
            name: plan.name.clone(),
            arn: self.arn("iam", &format!("instance-profile/{}", plan.name)),
            role_name: role.name.clone(),
            created_at: Utc::now(),
        };
        let profile = InstanceProfile {
            name: record.name.clone(),
            arn: record.arn.clone(),
            role_name: record.role_name.clone(),
        };

        info!("Recorded instance profile {} for role {}", plan.name, role.name);
        state.instance_profiles.insert(plan.name.clone(), record);
        state.record(ResourceOperation::Create, "instance-profile", &plan.name);
        self.store.save(&state).await?;

        Ok(profile)
    }

    async fn create_cluster(&self, plan: &ClusterPlan, role: &Role) -> Result<ClusterHandle> {
        if plan.subnet_ids.is_empty() {
            return Err(ProvisionError::NoSubnets {
                cluster: plan.name.clone(),
                vpc_id: plan.vpc_id.clone(),
            }
            .into());
        }
        if !plan.endpoint_private_access && !plan.endpoint_public_access {
            return Err(ProvisionError::Rejected {
                resource_type: "cluster",
                name: plan.name.clone(),
                reason: String::from("at least one API server endpoint must be enabled"),
            }
            .into());
        }

        let mut state = self.state().await?;
        if !state.roles.contains_key(&role.name) {
            return Err(ProvisionError::missing("role", &role.name).into());
        }

        let spec_hash = self.hasher.hash_spec(plan);
        let now = Utc::now();

        let record = match state.clusters.get_mut(&plan.name) {
            Some(existing) if existing.spec_hash == spec_hash => {
                debug!("Cluster {} is up to date", plan.name);
                return Ok(handle(existing));
            }
            Some(existing) => {
                info!("Updating cluster {} in place", plan.name);
                existing.spec_hash = spec_hash;
                existing.updated_at = now;
                let record = existing.clone();
                state.record(ResourceOperation::Update, "cluster", &plan.name);
                record
            }
            None => {
                let record = ClusterRecord {
                    name: plan.name.clone(),
                    arn: self.arn("eks", &format!("cluster/{}", plan.name)),
                    endpoint: format!(
                        "https://{}.{}.{DRY_RUN_DOMAIN}",
                        plan.name, self.region
                    ),
                    certificate_authority: String::new(),
                    spec_hash,
                    created_at: now,
                    updated_at: now,
                };
                info!("Recorded cluster {} (Kubernetes {})", plan.name, plan.version);
                state.clusters.insert(plan.name.clone(), record.clone());
                state.record(ResourceOperation::Create, "cluster", &plan.name);
                record
            }
        };

        self.store.save(&state).await?;
        Ok(handle(&record))
    }

    async fn create_node_group(
        &self,
        cluster: &ClusterHandle,
        plan: &NodeGroupPlan,
        profile: &InstanceProfile,
    ) -> Result<()> {
        let mut state = self.state().await?;

        if !state.clusters.contains_key(&cluster.name) {
            return Err(ProvisionError::missing("cluster", &cluster.name).into());
        }
        if !state.instance_profiles.contains_key(&profile.name) {
            return Err(ProvisionError::missing("instance profile", &profile.name).into());
        }

        let key = ProvisionState::node_group_key(&cluster.name, &plan.name);
        let spec_hash = self.hasher.hash_spec(plan);
        let now = Utc::now();

        match state.node_groups.get_mut(&key) {
            Some(existing) if existing.spec_hash == spec_hash => {
                debug!("Node group {key} is up to date");
                return Ok(());
            }
            Some(existing) => {
                info!("Updating node group {key} in place");
                existing.spec_hash = spec_hash;
                existing.instance_profile.clone_from(&profile.name);
                existing.updated_at = now;
                state.record(ResourceOperation::Update, "node-group", &key);
            }
            None => {
                info!(
                    "Recorded node group {key}: {}x {}",
                    plan.desired_capacity, plan.instance_type
                );
                state.node_groups.insert(
                    key.clone(),
                    NodeGroupRecord {
                        name: plan.name.clone(),
                        cluster_name: cluster.name.clone(),
                        instance_profile: profile.name.clone(),
                        spec_hash,
                        created_at: now,
                        updated_at: now,
                    },
                );
                state.record(ResourceOperation::Create, "node-group", &key);
            }
        }

        self.store.save(&state).await
    }

    fn provisioner_type(&self) -> &'static str {
        "dry-run"
    }
}

fn handle(record: &ClusterRecord) -> ClusterHandle {
    ClusterHandle {
        name: record.name.clone(),
        arn: record.arn.clone(),
        endpoint: record.endpoint.clone(),
        certificate_authority: record.certificate_authority.clone(),
        simulated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::planner::{ResourceKind, TopologyResolver};
    use crate::config::fixtures::clean_config;
    use crate::state::LocalStateStore;
    use tempfile::TempDir;

    fn provisioner() -> (DryRunProvisioner<LocalStateStore>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path());
        (DryRunProvisioner::new(store), temp_dir)
    }

    async fn role_for(provisioner: &DryRunProvisioner<LocalStateStore>) -> Role {
        provisioner
            .create_role(&RolePlan::for_worker_nodes("main-role"))
            .await
            .unwrap()
    }

    async fn cluster_plan(provisioner: &DryRunProvisioner<LocalStateStore>) -> ClusterPlan {
        let network = provisioner.create_vpc("main-vpc").await.unwrap();
        let plan = TopologyResolver::new()
            .resolve(&clean_config(), &network)
            .unwrap();
        plan.cluster().clone()
    }

    #[tokio::test]
    async fn test_vpc_is_reused_by_name() {
        let (provisioner, _temp) = provisioner();

        let first = provisioner.create_vpc("main-vpc").await.unwrap();
        let second = provisioner.create_vpc("main-vpc").await.unwrap();

        assert_eq!(first, second);
        assert!(first.vpc_id.starts_with("vpc-"));
        assert_eq!(first.subnet_ids.len(), 2 * SUBNETS_PER_TIER);
    }

    #[tokio::test]
    async fn test_role_and_attachments_converge() {
        let (provisioner, _temp) = provisioner();
        let plan = RolePlan::for_worker_nodes("main-role");

        let role = provisioner.create_role(&plan).await.unwrap();
        assert_eq!(role.arn, "arn:aws:iam::000000000000:role/main-role");

        for _ in 0..2 {
            for attachment in &plan.attachments {
                provisioner.attach_policy(&role, attachment).await.unwrap();
            }
        }

        let state = provisioner.state().await.unwrap();
        assert_eq!(state.roles.len(), 1);
        assert_eq!(state.attachments.len(), 3);
        assert_eq!(state.attachments["main-role-policy-2"].role_name, "main-role");
    }

    #[tokio::test]
    async fn test_attach_to_unknown_role_fails() {
        let (provisioner, _temp) = provisioner();
        let role = Role {
            name: String::from("ghost"),
            arn: String::new(),
        };
        let plan = RolePlan::for_worker_nodes("ghost");

        let err = provisioner
            .attach_policy(&role, &plan.attachments[0])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Provision(ProvisionError::MissingDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_cluster_without_subnets_is_rejected() {
        let (provisioner, _temp) = provisioner();
        let role = role_for(&provisioner).await;
        let plan = TopologyResolver::new()
            .resolve(&clean_config(), &NetworkContext::new("vpc-empty", Vec::new()))
            .unwrap();

        let err = provisioner
            .create_cluster(plan.cluster(), &role)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Provision(ProvisionError::NoSubnets { .. })
        ));
    }

    #[tokio::test]
    async fn test_cluster_without_endpoints_is_rejected() {
        let (provisioner, _temp) = provisioner();
        let role = role_for(&provisioner).await;
        let mut plan = cluster_plan(&provisioner).await;
        plan.endpoint_private_access = false;
        plan.endpoint_public_access = false;

        let err = provisioner.create_cluster(&plan, &role).await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::Provision(ProvisionError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_cluster_is_idempotent_and_updates_in_place() {
        let (provisioner, _temp) = provisioner();
        let role = role_for(&provisioner).await;
        let mut plan = cluster_plan(&provisioner).await;

        let first = provisioner.create_cluster(&plan, &role).await.unwrap();
        let again = provisioner.create_cluster(&plan, &role).await.unwrap();
        assert_eq!(first, again);
        assert!(first.simulated);
        assert_eq!(first.endpoint, "https://main.us-east-1.eks.dry-run.invalid");
        assert!(first.certificate_authority.is_empty());

        let before = provisioner.state().await.unwrap().clusters["main"].spec_hash.clone();
        plan.version = String::from("1.13");
        let updated = provisioner.create_cluster(&plan, &role).await.unwrap();

        assert_eq!(updated.endpoint, first.endpoint);
        let state = provisioner.state().await.unwrap();
        assert_eq!(state.clusters.len(), 1);
        assert_ne!(state.clusters["main"].spec_hash, before);
        assert_eq!(
            state.history.last().map(|h| h.operation),
            Some(ResourceOperation::Update)
        );
    }

    #[tokio::test]
    async fn test_node_group_requires_known_cluster() {
        let (provisioner, _temp) = provisioner();
        let role = role_for(&provisioner).await;
        let network = provisioner.create_vpc("main-vpc").await.unwrap();
        let plan = TopologyResolver::new()
            .resolve(&clean_config(), &network)
            .unwrap();
        let group = plan.node_group().unwrap();
        let profile = provisioner
            .create_instance_profile(&group.instance_profile, &role)
            .await
            .unwrap();
        let unknown = ClusterHandle {
            name: String::from("elsewhere"),
            arn: String::new(),
            endpoint: String::new(),
            certificate_authority: String::new(),
            simulated: true,
        };

        let err = provisioner
            .create_node_group(&unknown, group, &profile)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::Provision(ProvisionError::MissingDependency {
                resource_type: "cluster",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_node_group_converges() {
        let (provisioner, _temp) = provisioner();
        let role = role_for(&provisioner).await;
        let network = provisioner.create_vpc("main-vpc").await.unwrap();
        let plan = TopologyResolver::new()
            .resolve(&clean_config(), &network)
            .unwrap();
        let cluster = provisioner.create_cluster(plan.cluster(), &role).await.unwrap();
        let group = plan.node_group().unwrap();
        let profile = provisioner
            .create_instance_profile(&group.instance_profile, &role)
            .await
            .unwrap();

        provisioner.create_node_group(&cluster, group, &profile).await.unwrap();
        provisioner.create_node_group(&cluster, group, &profile).await.unwrap();

        let state = provisioner.state().await.unwrap();
        assert_eq!(state.node_groups.len(), 1);
        assert_eq!(state.node_groups["main/workers"].instance_profile, "main-profile");

        let created = state
            .history
            .iter()
            .filter(|h| h.resource_type == ResourceKind::NodeGroup.to_string())
            .count();
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_mark_applied_records_hash() {
        let (provisioner, _temp) = provisioner();

        provisioner.mark_applied("abc").await.unwrap();

        assert_eq!(provisioner.state().await.unwrap().config_hash, "abc");
    }
}
