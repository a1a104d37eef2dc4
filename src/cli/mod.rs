//! CLI module for the eksdeploy tool.
//!
//! This module provides the command-line interface for validating,
//! planning and provisioning clusters.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
