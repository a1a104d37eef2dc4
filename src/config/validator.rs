//! Configuration validation for cluster configs.
//!
//! Every rule is evaluated on every run. Errors block provisioning,
//! recommendations are informational only. Both lists keep the order in which
//! the rules are declared, which is also the order they are displayed in.

use serde::Serialize;
use tracing::debug;

use crate::error::{ConfigError, DeployError, Result};

use super::cluster::ClusterConfig;

/// Kubernetes versions EKS can currently create control planes for.
pub const SUPPORTED_KUBERNETES_VERSIONS: &[&str] = &["1.12", "1.13", "1.14"];

const VERSIONS_DOC_URL: &str =
    "https://docs.aws.amazon.com/eks/latest/userguide/kubernetes-versions.html";

/// Validator for cluster configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

/// Diagnostics produced by a validation run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Hard errors, in rule order.
    pub errors: Vec<String>,
    /// Soft recommendations, in rule order.
    pub recommendations: Vec<String>,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a cluster configuration.
    #[must_use]
    pub fn validate(&self, config: &ClusterConfig) -> ValidationResult {
        let result = ValidationResult {
            errors: Self::errors(config),
            recommendations: Self::recommendations(config),
        };

        debug!(
            errors = result.error_count(),
            recommendations = result.recommendation_count(),
            "Configuration validation finished"
        );

        result
    }

    fn errors(config: &ClusterConfig) -> Vec<String> {
        let mut errors = Vec::new();

        if config.vpc_name.is_empty() {
            errors.push(String::from("VPC Name cannot be empty"));
        }

        if config.cluster_name.is_empty() {
            errors.push(String::from("Cluster name cannot be empty"));
        }

        // Both initial node checks fire for zero.
        if config.initial_nodes == 0 {
            errors.push(String::from("Initial nodes cannot be empty"));
        }

        if config.initial_nodes < 1 {
            errors.push(String::from("Initial nodes cannot be less than one"));
        }

        if config.max_nodes < config.initial_nodes {
            errors.push(String::from("Max nodes cannot be less than initial nodes"));
        }

        if config.max_nodes < config.min_nodes {
            errors.push(String::from("Max nodes cannot be less than min nodes"));
        }

        if !config.private_endpoint && !config.public_endpoint {
            errors.push(String::from(
                "Either public or private endpoint access must be enabled",
            ));
        }

        if !SUPPORTED_KUBERNETES_VERSIONS.contains(&config.kubernetes_version.as_str()) {
            errors.push(format!(
                "Kubernetes version {} is not supported by EKS currently, please check {VERSIONS_DOC_URL} for supported versions",
                config.kubernetes_version
            ));
        }

        if config.instance_type_name.is_empty() {
            errors.push(String::from("Instance type cannot be empty"));
        }

        if config.instance_type.is_none() {
            errors.push(String::from("Instance type not recognized"));
        }

        if config.autoscaling_group_name.is_empty() {
            errors.push(String::from("Autoscaling group name cannot be empty"));
        }

        if config.node_group_name.is_empty() && !config.skip_default_node_group {
            errors.push(String::from(
                "Node group name cannot be empty if skipDefaultNodeGroup is set",
            ));
        }

        if config.ami_id.is_empty() {
            errors.push(String::from("AMI ID cannot be empty"));
        }

        errors
    }

    fn recommendations(config: &ClusterConfig) -> Vec<String> {
        let mut recommendations = Vec::new();

        if config.initial_nodes < 3 {
            recommendations.push(String::from(
                "Please consider an initial node size of 3 or more nodes",
            ));
        }

        if config.min_nodes < 2 {
            recommendations.push(String::from(
                "Please consider a minimum node size of at least 2 nodes",
            ));
        }

        if config.create_public_ips {
            recommendations.push(String::from(
                "Please consider creating node pools without public IPs for better security",
            ));
        }

        if !config.has_security_group_tags() {
            recommendations.push(String::from(
                "Please consider adding at least 1 tag to the created security group",
            ));
        }

        if !config.has_log_types() {
            recommendations.push(String::from(
                "Please consider adding at least api and audit log types for audit purposes",
            ));
        }

        if config.public_endpoint && !config.private_endpoint {
            recommendations.push(String::from(
                "Please consider adding private endpoint access only",
            ));
        }

        if config.fargate {
            recommendations.push(String::from(
                "Please consider not using fargate for a traditional kubernetes cluster",
            ));
        }

        if !config.skip_default_node_group {
            recommendations.push(String::from(
                "Please consider skipping the default node group so groups are created with secure roles",
            ));
        }

        if config.use_dashboard {
            recommendations.push(String::from(
                "Please consider disabling the default kubernetes dashboard because it has been deprecated and it can introduce security vulnerabilities",
            ));
        }

        recommendations
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of recommendations.
    #[must_use]
    pub const fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }

    /// Converts outstanding errors into a fatal configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationFailed`] if any error was found.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.recommendations)
        } else {
            Err(DeployError::Config(ConfigError::ValidationFailed {
                count: self.errors.len(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::clean_config;

    fn validate(config: &ClusterConfig) -> ValidationResult {
        ConfigValidator::new().validate(config)
    }

    #[test]
    fn test_clean_config_has_no_diagnostics() {
        let result = validate(&clean_config());
        assert!(result.is_valid());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn test_zero_initial_nodes_reports_both_errors() {
        let mut config = clean_config();
        config.initial_nodes = 0;

        let result = validate(&config);
        assert_eq!(
            result.errors,
            vec![
                "Initial nodes cannot be empty",
                "Initial nodes cannot be less than one",
            ]
        );
    }

    #[test]
    fn test_negative_initial_nodes_reports_only_lower_bound() {
        let mut config = clean_config();
        config.initial_nodes = -1;

        let result = validate(&config);
        assert_eq!(result.errors, vec!["Initial nodes cannot be less than one"]);
    }

    #[test]
    fn test_every_error_in_rule_order() {
        let config = ClusterConfig {
            vpc_name: String::new(),
            cluster_name: String::new(),
            initial_nodes: 0,
            min_nodes: 4,
            max_nodes: -1,
            create_public_ips: false,
            security_group_tags: vec![String::from("tag")],
            log_types: vec![String::from("api")],
            private_endpoint: false,
            public_endpoint: false,
            fargate: false,
            instance_profile_name: String::new(),
            instance_type_name: String::new(),
            instance_type: None,
            role_name: String::new(),
            skip_default_node_group: false,
            autoscaling_group_name: String::new(),
            node_group_name: String::new(),
            kubernetes_version: String::from("1.15"),
            use_dashboard: false,
            ami_id: String::new(),
        };

        let result = validate(&config);
        assert_eq!(
            result.errors,
            vec![
                String::from("VPC Name cannot be empty"),
                String::from("Cluster name cannot be empty"),
                String::from("Initial nodes cannot be empty"),
                String::from("Initial nodes cannot be less than one"),
                String::from("Max nodes cannot be less than initial nodes"),
                String::from("Max nodes cannot be less than min nodes"),
                String::from("Either public or private endpoint access must be enabled"),
                format!(
                    "Kubernetes version 1.15 is not supported by EKS currently, please check {VERSIONS_DOC_URL} for supported versions"
                ),
                String::from("Instance type cannot be empty"),
                String::from("Instance type not recognized"),
                String::from("Autoscaling group name cannot be empty"),
                String::from("Node group name cannot be empty if skipDefaultNodeGroup is set"),
                String::from("AMI ID cannot be empty"),
            ]
        );
    }

    #[test]
    fn test_every_recommendation_in_rule_order() {
        let mut config = clean_config();
        config.initial_nodes = 2;
        config.min_nodes = 1;
        config.create_public_ips = true;
        config.security_group_tags = vec![String::new()];
        config.log_types = vec![String::new()];
        config.private_endpoint = false;
        config.public_endpoint = true;
        config.fargate = true;
        config.skip_default_node_group = false;
        config.use_dashboard = true;

        let result = validate(&config);
        assert!(result.is_valid());
        assert_eq!(
            result.recommendations,
            vec![
                "Please consider an initial node size of 3 or more nodes",
                "Please consider a minimum node size of at least 2 nodes",
                "Please consider creating node pools without public IPs for better security",
                "Please consider adding at least 1 tag to the created security group",
                "Please consider adding at least api and audit log types for audit purposes",
                "Please consider adding private endpoint access only",
                "Please consider not using fargate for a traditional kubernetes cluster",
                "Please consider skipping the default node group so groups are created with secure roles",
                "Please consider disabling the default kubernetes dashboard because it has been deprecated and it can introduce security vulnerabilities",
            ]
        );
    }

    #[test]
    fn test_missing_endpoints_always_error() {
        for skip in [true, false] {
            let mut config = clean_config();
            config.private_endpoint = false;
            config.public_endpoint = false;
            config.skip_default_node_group = skip;
            config.kubernetes_version = String::from("0.1");

            let result = validate(&config);
            assert!(result
                .errors
                .iter()
                .any(|e| e == "Either public or private endpoint access must be enabled"));
        }
    }

    #[test]
    fn test_version_outside_supported_set() {
        for version in ["1.11", "1.15", "", "1.14.0", "v1.14"] {
            let mut config = clean_config();
            config.kubernetes_version = String::from(version);

            let result = validate(&config);
            let version_errors = result
                .errors
                .iter()
                .filter(|e| e.starts_with("Kubernetes version"))
                .count();
            assert_eq!(version_errors, 1, "version {version:?}");
            assert!(result.errors[0].contains(&format!("Kubernetes version {version} ")));
        }

        for version in SUPPORTED_KUBERNETES_VERSIONS {
            let mut config = clean_config();
            config.kubernetes_version = (*version).to_string();
            assert!(validate(&config).is_valid(), "version {version}");
        }
    }

    #[test]
    fn test_unknown_instance_type() {
        let mut config = clean_config();
        config.instance_type_name = String::from("t2.gigantic");
        config.instance_type = None;

        let result = validate(&config);
        assert_eq!(result.errors, vec!["Instance type not recognized"]);
    }

    #[test]
    fn test_node_group_name_only_needed_for_default_group() {
        let mut config = clean_config();
        config.node_group_name = String::new();
        config.skip_default_node_group = true;
        assert!(validate(&config).is_valid());

        config.skip_default_node_group = false;
        assert_eq!(
            validate(&config).errors,
            vec!["Node group name cannot be empty if skipDefaultNodeGroup is set"]
        );
    }

    #[test]
    fn test_max_below_min() {
        let mut config = clean_config();
        config.initial_nodes = 1;
        config.min_nodes = 2;
        config.max_nodes = 1;

        let result = validate(&config);
        assert_eq!(result.errors, vec!["Max nodes cannot be less than min nodes"]);
    }

    #[test]
    fn test_validation_is_repeatable() {
        let mut config = clean_config();
        config.initial_nodes = 0;
        config.use_dashboard = true;

        let validator = ConfigValidator::new();
        assert_eq!(validator.validate(&config), validator.validate(&config));
    }

    #[test]
    fn test_into_result() {
        let mut config = clean_config();
        config.fargate = true;
        let recommendations = validate(&config).into_result().unwrap();
        assert_eq!(recommendations.len(), 1);

        config.ami_id = String::new();
        let err = validate(&config).into_result().unwrap_err();
        assert!(err.is_validation_failure());
    }
}
