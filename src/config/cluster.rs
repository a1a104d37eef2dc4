//! The strongly-typed cluster configuration record.
//!
//! A [`ClusterConfig`] is built once from a [`ConfigSource`] and is read-only
//! afterwards. Derived fields (the resolved instance type) are filled in at
//! construction time so that validation and planning only ever read it.

use serde::Serialize;

use crate::error::Result;

use super::instance_type::InstanceType;
use super::source::ConfigSource;

/// External names of every configuration key the cluster requires.
pub mod keys {
    /// Name of the VPC to create.
    pub const VPC_NAME: &str = "vpc-name";
    /// Name of the EKS cluster.
    pub const CLUSTER_NAME: &str = "cluster-name";
    /// Desired node count at creation.
    pub const INITIAL_NODES: &str = "initial-nodes";
    /// Minimum node count.
    pub const MIN_NODES: &str = "min-nodes";
    /// Maximum node count.
    pub const MAX_NODES: &str = "max-nodes";
    /// Whether worker nodes get public IPs.
    pub const CREATE_PUBLIC_IPS: &str = "create-public-ips";
    /// Comma-joined security group tags.
    pub const SECURITY_GROUP_TAGS: &str = "security-group-tags";
    /// Comma-joined control plane log types.
    pub const LOG_TYPES: &str = "log-types";
    /// Private API endpoint access.
    pub const PRIVATE_ENDPOINT: &str = "private-endpoint";
    /// Public API endpoint access.
    pub const PUBLIC_ENDPOINT: &str = "public-endpoint";
    /// Whether to enable Fargate.
    pub const FARGATE: &str = "fargate";
    /// Instance profile name.
    pub const INSTANCE_PROFILE_NAME: &str = "instance-profile-name";
    /// Worker instance type.
    pub const INSTANCE_TYPE: &str = "instance-type";
    /// Worker instance role name.
    pub const ROLE_NAME: &str = "role-name";
    /// Whether to skip the provider managed default node group.
    pub const SKIP_DEFAULT_NODE_GROUP: &str = "skip-default-node-group";
    /// Autoscaling group name.
    pub const AUTOSCALING_GROUP_NAME: &str = "autoscaling-group-name";
    /// Name of the caller-managed node group.
    pub const NODE_GROUP_NAME: &str = "node-group-name";
    /// Kubernetes control plane version.
    pub const KUBERNETES_VERSION: &str = "kubernetes-version";
    /// Whether to deploy the Kubernetes dashboard.
    pub const USE_DASHBOARD: &str = "use-dashboard";
    /// AMI used by the caller-managed node group.
    pub const AMI_ID: &str = "ami-id";

    /// Every key, in the order they are read.
    pub const ALL: &[&str] = &[
        VPC_NAME,
        CLUSTER_NAME,
        INITIAL_NODES,
        MIN_NODES,
        MAX_NODES,
        CREATE_PUBLIC_IPS,
        SECURITY_GROUP_TAGS,
        LOG_TYPES,
        PRIVATE_ENDPOINT,
        PUBLIC_ENDPOINT,
        FARGATE,
        INSTANCE_PROFILE_NAME,
        INSTANCE_TYPE,
        ROLE_NAME,
        SKIP_DEFAULT_NODE_GROUP,
        AUTOSCALING_GROUP_NAME,
        NODE_GROUP_NAME,
        KUBERNETES_VERSION,
        USE_DASHBOARD,
        AMI_ID,
    ];
}

/// Validated-shape configuration for a single cluster run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterConfig {
    /// Name of the VPC to create.
    pub vpc_name: String,
    /// Name of the EKS cluster.
    pub cluster_name: String,
    /// Desired node count at creation.
    pub initial_nodes: i64,
    /// Minimum node count.
    pub min_nodes: i64,
    /// Maximum node count.
    pub max_nodes: i64,
    /// Whether worker nodes get public IPs.
    pub create_public_ips: bool,
    /// Security group tags. `[""]` when none were given.
    pub security_group_tags: Vec<String>,
    /// Control plane log types. `[""]` when none were given.
    pub log_types: Vec<String>,
    /// Private API endpoint access.
    pub private_endpoint: bool,
    /// Public API endpoint access.
    pub public_endpoint: bool,
    /// Whether to enable Fargate.
    pub fargate: bool,
    /// Instance profile name.
    pub instance_profile_name: String,
    /// Instance type name as written in the configuration.
    pub instance_type_name: String,
    /// Instance type resolved from `instance_type_name`.
    pub instance_type: Option<InstanceType>,
    /// Worker instance role name.
    pub role_name: String,
    /// Skip the default node group and create a caller-managed one instead.
    pub skip_default_node_group: bool,
    /// Autoscaling group name.
    pub autoscaling_group_name: String,
    /// Name of the caller-managed node group.
    pub node_group_name: String,
    /// Kubernetes control plane version.
    pub kubernetes_version: String,
    /// Whether to deploy the Kubernetes dashboard.
    pub use_dashboard: bool,
    /// AMI used by the caller-managed node group.
    pub ami_id: String,
}

impl ClusterConfig {
    /// Reads every required key from `source` and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a key is missing or has the wrong type.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let mut config = Self {
            vpc_name: source.require_string(keys::VPC_NAME)?,
            cluster_name: source.require_string(keys::CLUSTER_NAME)?,
            initial_nodes: source.require_number(keys::INITIAL_NODES)?,
            min_nodes: source.require_number(keys::MIN_NODES)?,
            max_nodes: source.require_number(keys::MAX_NODES)?,
            create_public_ips: source.require_boolean(keys::CREATE_PUBLIC_IPS)?,
            security_group_tags: split_list(&source.require_string(keys::SECURITY_GROUP_TAGS)?),
            log_types: split_list(&source.require_string(keys::LOG_TYPES)?),
            private_endpoint: source.require_boolean(keys::PRIVATE_ENDPOINT)?,
            public_endpoint: source.require_boolean(keys::PUBLIC_ENDPOINT)?,
            fargate: source.require_boolean(keys::FARGATE)?,
            instance_profile_name: source.require_string(keys::INSTANCE_PROFILE_NAME)?,
            instance_type_name: source.require_string(keys::INSTANCE_TYPE)?,
            instance_type: None,
            role_name: source.require_string(keys::ROLE_NAME)?,
            skip_default_node_group: source.require_boolean(keys::SKIP_DEFAULT_NODE_GROUP)?,
            autoscaling_group_name: source.require_string(keys::AUTOSCALING_GROUP_NAME)?,
            node_group_name: source.require_string(keys::NODE_GROUP_NAME)?,
            kubernetes_version: source.require_string(keys::KUBERNETES_VERSION)?,
            use_dashboard: source.require_boolean(keys::USE_DASHBOARD)?,
            ami_id: source.require_string(keys::AMI_ID)?,
        };

        config.instance_type = InstanceType::lookup(&config.instance_type_name);
        Ok(config)
    }

    /// Returns true if at least one log type was configured.
    #[must_use]
    pub fn has_log_types(&self) -> bool {
        !is_empty_sentinel(&self.log_types)
    }

    /// Returns true if at least one security group tag was configured.
    #[must_use]
    pub fn has_security_group_tags(&self) -> bool {
        !is_empty_sentinel(&self.security_group_tags)
    }

    /// Log types to enable on the control plane, empty when none were given.
    #[must_use]
    pub fn enabled_log_types(&self) -> Vec<String> {
        if self.has_log_types() {
            self.log_types.clone()
        } else {
            Vec::new()
        }
    }
}

/// Splits a comma-joined list. An empty input yields `[""]`.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

/// A list is considered empty when its first element is the empty string.
fn is_empty_sentinel(list: &[String]) -> bool {
    list.first().is_none_or(String::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::error::{ConfigError, DeployError};

    fn source() -> StackConfig {
        StackConfig::from_pairs([
            (keys::VPC_NAME, "main-vpc"),
            (keys::CLUSTER_NAME, "main"),
            (keys::INITIAL_NODES, "3"),
            (keys::MIN_NODES, "2"),
            (keys::MAX_NODES, "5"),
            (keys::CREATE_PUBLIC_IPS, "false"),
            (keys::SECURITY_GROUP_TAGS, "team=platform,env=prod"),
            (keys::LOG_TYPES, ""),
            (keys::PRIVATE_ENDPOINT, "true"),
            (keys::PUBLIC_ENDPOINT, "false"),
            (keys::FARGATE, "false"),
            (keys::INSTANCE_PROFILE_NAME, "main-profile"),
            (keys::INSTANCE_TYPE, "t3.large"),
            (keys::ROLE_NAME, "main-role"),
            (keys::SKIP_DEFAULT_NODE_GROUP, "true"),
            (keys::AUTOSCALING_GROUP_NAME, "main-asg"),
            (keys::NODE_GROUP_NAME, "workers"),
            (keys::KUBERNETES_VERSION, "1.14"),
            (keys::USE_DASHBOARD, "false"),
            (keys::AMI_ID, "ami-0abc"),
        ])
    }

    #[test]
    fn test_from_source_reads_every_key() {
        let config = ClusterConfig::from_source(&source()).unwrap();

        assert_eq!(config.vpc_name, "main-vpc");
        assert_eq!(config.initial_nodes, 3);
        assert_eq!(config.max_nodes, 5);
        assert!(config.private_endpoint);
        assert!(!config.public_endpoint);
        assert_eq!(config.security_group_tags, vec!["team=platform", "env=prod"]);
        assert_eq!(config.instance_type_name, "t3.large");
        assert_eq!(config.instance_type, Some(InstanceType::T3Large));
        assert!(config.skip_default_node_group);
        assert_eq!(config.ami_id, "ami-0abc");
    }

    #[test]
    fn test_empty_list_is_sentinel() {
        let config = ClusterConfig::from_source(&source()).unwrap();

        assert_eq!(config.log_types, vec![String::new()]);
        assert!(!config.has_log_types());
        assert!(config.enabled_log_types().is_empty());
        assert!(config.has_security_group_tags());
    }

    #[test]
    fn test_unknown_instance_type_is_left_unresolved() {
        let mut source = source();
        source.set(keys::INSTANCE_TYPE, "t9.galactic");

        let config = ClusterConfig::from_source(&source).unwrap();

        assert_eq!(config.instance_type_name, "t9.galactic");
        assert_eq!(config.instance_type, None);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let mut source = source();
        source.remove(keys::AMI_ID);

        let err = ClusterConfig::from_source(&source).unwrap_err();
        assert!(matches!(
            err,
            DeployError::Config(ConfigError::MissingKey { ref key }) if key == keys::AMI_ID
        ));
    }

    #[test]
    fn test_wrong_type_is_fatal() {
        let mut source = source();
        source.set(keys::MAX_NODES, "lots");

        let err = ClusterConfig::from_source(&source).unwrap_err();
        assert!(matches!(err, DeployError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_split_keeps_order_and_whitespace() {
        assert_eq!(split_list("api,audit"), vec!["api", "audit"]);
        assert_eq!(split_list("api, audit"), vec!["api", " audit"]);
        assert_eq!(split_list(""), vec![""]);
    }
}
