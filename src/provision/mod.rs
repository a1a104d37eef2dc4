//! Resource provisioning.
//!
//! [`Provisioner`] is the seam between planning and the outside world.
//! [`DryRunProvisioner`] records what would be created in local state without
//! touching a cloud account. Clusters it returns are flagged as simulated and
//! never get a kubeconfig.

mod dry_run;
mod kubeconfig;
mod provisioner;

pub use dry_run::{DryRunProvisioner, DEFAULT_REGION, DRY_RUN_DOMAIN};
pub use kubeconfig::Kubeconfig;
#[cfg(test)]
pub use provisioner::MockProvisioner;
pub use provisioner::{ClusterHandle, InstanceProfile, Provisioner, Role};
