//! Configuration module for the EKS deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Reading raw values from a [`ConfigSource`] (stack file, environment)
//! - Building the typed [`ClusterConfig`]
//! - Validation into ordered errors and recommendations
//! - Computing configuration hashes for change detection

mod cluster;
mod hash;
mod instance_type;
mod source;
mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cluster::{keys, ClusterConfig};
pub use hash::ConfigHasher;
pub use instance_type::InstanceType;
pub use source::{
    env_var_name, find_config_file, load_dotenv, ConfigSource, StackConfig, DEFAULT_CONFIG_FILES,
    ENV_PREFIX,
};
pub use validator::{ConfigValidator, ValidationResult, SUPPORTED_KUBERNETES_VERSIONS};
