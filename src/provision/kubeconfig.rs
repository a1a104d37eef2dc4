//! Kubeconfig rendering for provisioned clusters.

use serde::Serialize;

use crate::error::{ProvisionError, Result};

use super::provisioner::ClusterHandle;

const CONTEXT_NAME: &str = "aws";
const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// A kubeconfig granting access to one cluster through `aws eks get-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion")]
    api_version: String,
    kind: String,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: String,
    users: Vec<NamedUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    certificate_authority_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct UserEntry {
    exec: ExecEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecEntry {
    api_version: String,
    command: String,
    args: Vec<String>,
}

impl Kubeconfig {
    /// Builds the kubeconfig for a reachable cluster.
    ///
    /// Returns `None` for simulated clusters, which have no server to
    /// connect to.
    #[must_use]
    pub fn for_cluster(cluster: &ClusterHandle) -> Option<Self> {
        if cluster.simulated {
            return None;
        }
        Some(Self {
            api_version: String::from("v1"),
            kind: String::from("Config"),
            clusters: vec![NamedCluster {
                name: cluster.name.clone(),
                cluster: ClusterEntry {
                    server: cluster.endpoint.clone(),
                    certificate_authority_data: cluster.certificate_authority.clone(),
                },
            }],
            contexts: vec![NamedContext {
                name: String::from(CONTEXT_NAME),
                context: ContextEntry {
                    cluster: cluster.name.clone(),
                    user: String::from(CONTEXT_NAME),
                },
            }],
            current_context: String::from(CONTEXT_NAME),
            users: vec![NamedUser {
                name: String::from(CONTEXT_NAME),
                user: UserEntry {
                    exec: ExecEntry {
                        api_version: String::from(EXEC_API_VERSION),
                        command: String::from("aws"),
                        args: vec![
                            String::from("eks"),
                            String::from("get-token"),
                            String::from("--cluster-name"),
                            cluster.name.clone(),
                        ],
                    },
                },
            }],
        })
    }

    /// Name of the cluster this kubeconfig points at.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        self.clusters.first().map_or("", |c| c.name.as_str())
    }

    /// Renders the kubeconfig as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            ProvisionError::Kubeconfig {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Renders the kubeconfig as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ProvisionError::Kubeconfig {
                message: e.to_string(),
            }
            .into()
        })
    }
}
