//! Output formatting for CLI commands.
//!
//! Diagnostics, plans and apply summaries are rendered either as
//! human-readable text or as JSON for scripting.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, ValidationResult};
use crate::error::Result;
use crate::planner::{ApplyOutcome, PlanStep, ProvisionPlan};
use crate::provision::Kubeconfig;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan step row for table display.
#[derive(Tabled)]
struct PlanStepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats validation diagnostics.
    ///
    /// When errors are present only the errors are shown, since nothing is
    /// provisioned until they are fixed.
    #[must_use]
    pub fn format_diagnostics(&self, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_diagnostics_text(result),
        }
    }

    fn format_diagnostics_text(result: &ValidationResult) -> String {
        let mut output = String::new();

        if !result.is_valid() {
            let _ = writeln!(
                output,
                "{} {} errors were found during config validation, describing below...",
                "error:".red().bold(),
                result.error_count()
            );
            for error in &result.errors {
                let _ = writeln!(output, "{} * {error}", "error:".red());
            }
            output.push_str("Please fix the above errors before continuing.\n");
            return output;
        }

        output.push_str("No configuration errors found\n");

        if result.recommendations.is_empty() {
            output.push_str("No configuration recommendations found\n");
            return output;
        }

        let _ = writeln!(
            output,
            "{} {} recommendations were generated during config validation, describing below...",
            "recommendation:".yellow().bold(),
            result.recommendation_count()
        );
        for recommendation in &result.recommendations {
            let _ = writeln!(output, "{} * {recommendation}", "recommendation:".yellow());
        }
        output.push_str("Please consider the above recommendations before creating the cluster.\n");

        output
    }

    /// Formats a provisioning plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ProvisionPlan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ProvisionPlan) -> String {
        let mut output = String::new();
        let hasher = ConfigHasher::new();

        let topology = if plan.is_custom_node_group() {
            "caller-managed node group"
        } else {
            "default node group"
        };

        let _ = writeln!(output, "\nProvision Plan ({topology})");
        let _ = writeln!(
            output,
            "   Config hash: {}\n",
            hasher.short_hash(&plan.config_hash)
        );

        let rows: Vec<PlanStepRow> = plan
            .steps()
            .into_iter()
            .enumerate()
            .map(|(i, step)| PlanStepRow {
                index: i + 1,
                resource: step.kind.to_string(),
                name: step.name,
                detail: Self::truncate(&step.detail, 60),
            })
            .collect();

        let count = rows.len();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = writeln!(output, "\nPlan: {} to create", count.to_string().green());

        output
    }

    /// Formats the summary of a completed apply.
    #[must_use]
    pub fn format_apply(&self, outcome: &ApplyOutcome) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ApplyJson::from(outcome)).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if outcome.cluster.simulated {
                    format!(
                        "{} Cluster {} recorded (dry run, no AWS resources were created)\n",
                        "~".yellow(),
                        outcome.cluster.name.bold()
                    )
                } else {
                    format!(
                        "{} Cluster {} is ready\n",
                        "✓".green(),
                        outcome.cluster.name.bold()
                    )
                };
                let _ = writeln!(output, "   VPC: {}", outcome.network.vpc_id);
                let _ = writeln!(output, "   Endpoint: {}", outcome.cluster.endpoint);
                let _ = writeln!(output, "   Resources: {}", outcome.plan.steps().len());
                if outcome.kubeconfig.is_none() {
                    output.push_str("   No kubeconfig written: the cluster cannot be reached.\n");
                }
                output
            }
        }
    }

    /// Renders a kubeconfig in the selected format.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be serialized.
    pub fn format_kubeconfig(&self, kubeconfig: &Kubeconfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => kubeconfig.to_json(),
            OutputFormat::Text => kubeconfig.to_yaml(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson<'a> {
    config_hash: &'a str,
    custom_node_group: bool,
    steps: Vec<PlanStep>,
    plan: &'a ProvisionPlan,
}

impl<'a> From<&'a ProvisionPlan> for PlanJson<'a> {
    fn from(plan: &'a ProvisionPlan) -> Self {
        Self {
            config_hash: &plan.config_hash,
            custom_node_group: plan.is_custom_node_group(),
            steps: plan.steps(),
            plan,
        }
    }
}

#[derive(Serialize)]
struct ApplyJson<'a> {
    cluster: &'a str,
    dry_run: bool,
    arn: &'a str,
    endpoint: &'a str,
    vpc_id: &'a str,
    subnet_ids: &'a [String],
    steps: Vec<PlanStep>,
}

impl<'a> From<&'a ApplyOutcome> for ApplyJson<'a> {
    fn from(outcome: &'a ApplyOutcome) -> Self {
        Self {
            cluster: &outcome.cluster.name,
            dry_run: outcome.cluster.simulated,
            arn: &outcome.cluster.arn,
            endpoint: &outcome.cluster.endpoint,
            vpc_id: &outcome.network.vpc_id,
            subnet_ids: &outcome.network.subnet_ids,
            steps: outcome.plan.steps(),
        }
    }
}
