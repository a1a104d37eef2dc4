//! Planning module for cluster provisioning.
//!
//! This module turns a validated configuration into a provisioning plan and
//! drives a [`Provisioner`](crate::provision::Provisioner) through it.

mod executor;
mod plan;
mod resolver;

pub use executor::{ApplyOutcome, PlanExecutor};
pub use plan::{
    ClusterPlan, DefaultNodeGroupPlan, InstanceProfilePlan, NetworkContext, NodeGroupPlan,
    PlanStep, PolicyAttachment, ProvisionPlan, ResourceKind, RolePlan, Topology,
    CUSTOM_NODE_GROUP_LABEL, KNOWN_AFTER_APPLY, MANAGED_POLICY_ARNS, TRUSTED_SERVICE,
};
pub use resolver::TopologyResolver;
