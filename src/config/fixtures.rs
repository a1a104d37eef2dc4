//! Shared configuration fixtures for unit tests.

use super::cluster::ClusterConfig;
use super::instance_type::InstanceType;

/// A configuration that passes every error rule and triggers no recommendation.
pub fn clean_config() -> ClusterConfig {
    ClusterConfig {
        vpc_name: String::from("main-vpc"),
        cluster_name: String::from("main"),
        initial_nodes: 3,
        min_nodes: 2,
        max_nodes: 5,
        create_public_ips: false,
        security_group_tags: vec![String::from("team=platform")],
        log_types: vec![String::from("api"), String::from("audit")],
        private_endpoint: true,
        public_endpoint: false,
        fargate: false,
        instance_profile_name: String::from("main-profile"),
        instance_type_name: String::from("t2.medium"),
        instance_type: Some(InstanceType::T2Medium),
        role_name: String::from("main-role"),
        skip_default_node_group: true,
        autoscaling_group_name: String::from("main-asg"),
        node_group_name: String::from("workers"),
        kubernetes_version: String::from("1.14"),
        use_dashboard: false,
        ami_id: String::from("ami-123"),
    }
}
