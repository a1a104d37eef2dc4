//! End-to-end scenarios through the public API: stack values in, validated
//! configuration, resolved topology and a provisioned cluster out.

use eks_deploy::config::{ClusterConfig, ConfigValidator, StackConfig};
use eks_deploy::error::{ConfigError, DeployError};
use eks_deploy::planner::{NetworkContext, PlanExecutor, Topology, TopologyResolver};
use eks_deploy::provision::DryRunProvisioner;
use eks_deploy::state::{LocalStateStore, StateStore};
use tempfile::TempDir;

fn stack(overrides: &[(&str, &str)]) -> StackConfig {
    let mut stack = StackConfig::from_pairs([
        ("eks-cluster:vpc-name", "main-vpc"),
        ("eks-cluster:cluster-name", "main"),
        ("initial-nodes", "3"),
        ("min-nodes", "2"),
        ("max-nodes", "5"),
        ("create-public-ips", "false"),
        ("security-group-tags", "team=platform"),
        ("log-types", "api,audit"),
        ("private-endpoint", "true"),
        ("public-endpoint", "false"),
        ("fargate", "false"),
        ("instance-profile-name", "main-profile"),
        ("instance-type", "t2.medium"),
        ("role-name", "main-role"),
        ("skip-default-node-group", "false"),
        ("autoscaling-group-name", "main-asg"),
        ("node-group-name", "workers"),
        ("kubernetes-version", "1.14"),
        ("use-dashboard", "false"),
        ("ami-id", "ami-123"),
    ]);
    for (key, value) in overrides {
        stack.set(*key, *value);
    }
    stack
}

fn config(overrides: &[(&str, &str)]) -> ClusterConfig {
    ClusterConfig::from_source(&stack(overrides)).unwrap()
}

fn provisioner(dir: &TempDir) -> DryRunProvisioner<LocalStateStore> {
    DryRunProvisioner::new(LocalStateStore::with_base_dir(dir.path().join(".eksdeploy")))
}

#[test]
fn default_node_group_scenario_is_valid_and_resolves_to_one_cluster() {
    let config = config(&[]);

    let result = ConfigValidator::new().validate(&config);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert_eq!(
        result.recommendations,
        vec![
            "Please consider skipping the default node group so groups are created with secure roles"
        ]
    );

    let plan = TopologyResolver::new()
        .resolve(&config, &NetworkContext::pending())
        .unwrap();

    match &plan.topology {
        Topology::DefaultNodeGroup { cluster } => {
            let group = cluster.default_node_group.as_ref().unwrap();
            assert_eq!(group.desired_capacity, 3);
            assert_eq!(group.min_size, 2);
            assert_eq!(group.max_size, 5);
            assert_eq!(group.instance_type.as_str(), "t2.medium");
            assert_eq!(cluster.version, "1.14");
        }
        Topology::CustomNodeGroup { .. } => panic!("expected the default node group topology"),
    }
}

#[test]
fn custom_node_group_scenario_allows_empty_node_group_name() {
    let config = config(&[("skip-default-node-group", "true"), ("node-group-name", "")]);

    let result = ConfigValidator::new().validate(&config);
    assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);

    let plan = TopologyResolver::new()
        .resolve(&config, &NetworkContext::pending())
        .unwrap();

    let group = plan.node_group().unwrap();
    assert_eq!(group.name, "");
    assert_eq!(group.instance_profile.role_name, "main-role");
    assert_eq!(group.ami_id, "ami-123");
    assert!(plan.cluster().default_node_group.is_none());
}

#[test]
fn default_node_group_requires_a_node_group_name() {
    let config = config(&[("node-group-name", "")]);

    let result = ConfigValidator::new().validate(&config);
    assert_eq!(
        result.errors,
        vec!["Node group name cannot be empty if skipDefaultNodeGroup is set"]
    );
}

#[test]
fn overrides_take_precedence_over_stack_values() {
    let stack = stack(&[]).with_overrides([
        (String::from("EKSDEPLOY_MAX_NODES"), String::from("9")),
        (String::from("EKSDEPLOY_NOT_A_KEY"), String::from("ignored")),
    ]);

    let config = ClusterConfig::from_source(&stack).unwrap();
    assert_eq!(config.max_nodes, 9);
}

#[test]
fn missing_key_is_fatal_before_validation() {
    let mut stack = stack(&[]);
    stack.remove("ami-id");

    let err = ClusterConfig::from_source(&stack).unwrap_err();
    assert!(matches!(
        err,
        DeployError::Config(ConfigError::MissingKey { ref key }) if key == "ami-id"
    ));
}

#[tokio::test]
async fn max_below_min_never_provisions() {
    let dir = TempDir::new().unwrap();
    let provisioner = provisioner(&dir);
    let config = config(&[("min-nodes", "2"), ("max-nodes", "1")]);

    let result = ConfigValidator::new().validate(&config);
    assert!(
        result
            .errors
            .iter()
            .any(|e| e == "Max nodes cannot be less than min nodes")
    );

    let err = PlanExecutor::new(&provisioner).apply(&config).await.unwrap_err();

    assert!(err.is_validation_failure());
    assert!(!provisioner.store().exists().await.unwrap());
}

#[tokio::test]
async fn apply_provisions_custom_node_group_and_converges() {
    let dir = TempDir::new().unwrap();
    let provisioner = provisioner(&dir);
    let config = config(&[("skip-default-node-group", "true")]);

    let first = PlanExecutor::new(&provisioner).apply(&config).await.unwrap();
    assert!(first.cluster.simulated);
    assert!(first.cluster.endpoint.ends_with(".invalid"));
    assert!(first.kubeconfig.is_none());

    let second = PlanExecutor::new(&provisioner).apply(&config).await.unwrap();
    assert_eq!(first.cluster, second.cluster);
    assert_eq!(first.network, second.network);

    let state = provisioner.state().await.unwrap();
    assert_eq!(state.vpcs.len(), 1);
    assert_eq!(state.roles.len(), 1);
    assert_eq!(state.attachments.len(), 3);
    assert_eq!(state.instance_profiles.len(), 1);
    assert_eq!(state.clusters.len(), 1);
    assert_eq!(state.node_groups.len(), 1);
    assert!(state.node_groups.contains_key("main/workers"));
}

#[tokio::test]
async fn apply_default_node_group_creates_no_separate_group() {
    let dir = TempDir::new().unwrap();
    let provisioner = provisioner(&dir);

    let outcome = PlanExecutor::new(&provisioner)
        .apply(&config(&[]))
        .await
        .unwrap();

    assert!(!outcome.plan.is_custom_node_group());
    let state = provisioner.state().await.unwrap();
    assert!(state.instance_profiles.is_empty());
    assert!(state.node_groups.is_empty());
    assert_eq!(state.clusters.len(), 1);
}
