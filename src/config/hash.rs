//! Configuration hashing for change detection.
//!
//! Hashes are used to show which configuration a plan was built from and to
//! detect whether a recorded resource still matches the requested one.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::cluster::ClusterConfig;

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire cluster configuration.
    ///
    /// Every string is length-prefixed and every list carries its item
    /// count, so no value can shift into a neighbouring field unnoticed.
    #[must_use]
    pub fn hash_config(&self, config: &ClusterConfig) -> String {
        let mut hasher = Sha256::new();

        // Identity
        for name in [
            &config.vpc_name,
            &config.cluster_name,
            &config.role_name,
            &config.instance_profile_name,
            &config.node_group_name,
            &config.autoscaling_group_name,
        ] {
            update_str(&mut hasher, name);
        }

        // Capacity
        hasher.update(config.initial_nodes.to_be_bytes());
        hasher.update(config.min_nodes.to_be_bytes());
        hasher.update(config.max_nodes.to_be_bytes());

        // Flags
        for flag in [
            config.create_public_ips,
            config.private_endpoint,
            config.public_endpoint,
            config.fargate,
            config.skip_default_node_group,
            config.use_dashboard,
        ] {
            hasher.update([u8::from(flag)]);
        }

        // Lists keep their configured order
        for list in [&config.security_group_tags, &config.log_types] {
            hasher.update((list.len() as u64).to_be_bytes());
            for item in list {
                update_str(&mut hasher, item);
            }
        }

        for value in [
            &config.kubernetes_version,
            &config.instance_type_name,
            &config.ami_id,
        ] {
            update_str(&mut hasher, value);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of any serializable resource description.
    #[must_use]
    pub fn hash_spec<T: Serialize>(&self, spec: &T) -> String {
        let bytes = serde_json::to_vec(spec).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}
