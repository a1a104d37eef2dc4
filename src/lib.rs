// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # eksdeploy
//!
//! Validates a declarative EKS cluster configuration and provisions the
//! cluster in one of two topologies.
//!
//! ## Overview
//!
//! A run goes through four stages:
//!
//! 1. **Load**: raw values come from a YAML stack file, `.env` and
//!    `EKSDEPLOY_*` environment overrides, and are type-checked into a
//!    [`ClusterConfig`].
//! 2. **Validate**: [`ConfigValidator`] reports hard errors and soft
//!    recommendations in a fixed order. Any error stops the run.
//! 3. **Resolve**: [`TopologyResolver`] picks either a cluster with a
//!    provider-managed default node group, or a bare cluster plus a
//!    caller-managed node group with its own instance profile.
//! 4. **Provision**: [`PlanExecutor`] drives a [`Provisioner`] through the
//!    plan in dependency order. Reachable clusters come back with a
//!    kubeconfig. The bundled [`DryRunProvisioner`] only records resources.
//!
//! ## Modules
//!
//! - [`config`]: Stack file loading, typed configuration and validation
//! - [`planner`]: Topology resolution and plan execution
//! - [`provision`]: Provisioner seam, dry-run provisioner and kubeconfig
//! - [`state`]: Local state storage and locking
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! config:
//!   vpc-name: main-vpc
//!   cluster-name: main
//!   initial-nodes: 3
//!   min-nodes: 2
//!   max-nodes: 5
//!   instance-type: t2.medium
//!   kubernetes-version: "1.14"
//!   skip-default-node-group: true
//!   # ...
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod provision;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ClusterConfig, ConfigHasher, ConfigSource, ConfigValidator, StackConfig, ValidationResult};
pub use error::{DeployError, Result};
pub use planner::{ApplyOutcome, PlanExecutor, ProvisionPlan, Topology, TopologyResolver};
pub use provision::{DryRunProvisioner, Kubeconfig, Provisioner};
pub use state::{LocalStateStore, ProvisionState, StateStore};
