//! Error types for the EKS deployment system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration lookup and validation, local state management, and
//! resource provisioning.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the EKS deployment system.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Provisioning errors raised by a provisioner.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A required configuration key is absent.
    #[error("Missing required configuration value '{key}'")]
    MissingKey {
        /// Name of the missing key.
        key: String,
    },

    /// A configuration value has the wrong type.
    #[error("Configuration value '{key}' must be {expected}, found '{found}'")]
    InvalidValue {
        /// Name of the offending key.
        key: String,
        /// Expected type description.
        expected: &'static str,
        /// The raw value that was found.
        found: String,
    },

    /// Semantic validation produced errors.
    #[error("{count} errors were found during config validation")]
    ValidationFailed {
        /// Number of validation errors.
        count: usize,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("Cluster {cluster} is being provisioned by {holder} (since {since})")]
    LockedByOther {
        /// Cluster the lock was taken for.
        cluster: String,
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Errors surfaced by a provisioner while creating resources.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The network context carries no subnets to place the cluster in.
    #[error("Cluster '{cluster}' cannot be created: VPC {vpc_id} has no subnets")]
    NoSubnets {
        /// Cluster being created.
        cluster: String,
        /// VPC that was used.
        vpc_id: String,
    },

    /// A resource referenced by another resource does not exist.
    #[error("{resource_type} '{name}' does not exist")]
    MissingDependency {
        /// Type of the missing resource.
        resource_type: &'static str,
        /// Name of the missing resource.
        name: String,
    },

    /// The provider rejected the requested field combination.
    #[error("Provider rejected {resource_type} '{name}': {reason}")]
    Rejected {
        /// Type of the rejected resource.
        resource_type: &'static str,
        /// Name of the rejected resource.
        name: String,
        /// Reason given by the provider.
        reason: String,
    },

    /// The kubeconfig could not be rendered.
    #[error("Failed to render kubeconfig: {message}")]
    Kubeconfig {
        /// Description of the rendering failure.
        message: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error came from configuration validation.
    #[must_use]
    pub const fn is_validation_failure(&self) -> bool {
        matches!(self, Self::Config(ConfigError::ValidationFailed { .. }))
    }
}

impl ConfigError {
    /// Creates a missing-key error.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, expected: &'static str, found: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            expected,
            found: found.into(),
        }
    }
}

impl StateError {
    /// Creates a corruption error for a state or lock file.
    #[must_use]
    pub fn corrupted(what: &str, cause: impl std::fmt::Display) -> Self {
        Self::Corrupted {
            message: format!("{what}: {cause}"),
        }
    }

    /// Creates a lock failure error.
    #[must_use]
    pub fn lock_failed(what: &str, cause: impl std::fmt::Display) -> Self {
        Self::LockFailed {
            message: format!("{what}: {cause}"),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl ProvisionError {
    /// Creates a missing dependency error.
    #[must_use]
    pub fn missing(resource_type: &'static str, name: impl Into<String>) -> Self {
        Self::MissingDependency {
            resource_type,
            name: name.into(),
        }
    }
}
