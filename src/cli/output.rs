//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, StackConfig, ValidationResult};
use crate::error::{Result, StackError};
use crate::network::SubnetTier;
use crate::planner::{DeploymentPlan, EmissionReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Subnet row for table display.
#[derive(Tabled)]
struct SubnetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "CIDR")]
    cidr: String,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Wave")]
    wave: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

/// Export row for table display.
#[derive(Tabled)]
struct ExportRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &StackConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "stack": config.qualified_name(),
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Configuration has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let _ = write!(output, "\nStack: {}\n", config.qualified_name());
                let _ = writeln!(output, "   Region: {}", config.region);
                let _ = writeln!(output, "   VPC: {} ({})", config.vpc.name, config.vpc.cidr);
                let _ = writeln!(output, "   Zones: up to {}", config.network.max_zones);
                let _ = writeln!(
                    output,
                    "   Database: {} {}",
                    config.database.engine, config.database.engine_version
                );
                let _ = writeln!(output, "   DNS: {}", config.dns.record_name());

                output
            }
        }
    }

    /// Formats a deployment plan for display.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan graph cannot be ordered.
    pub fn format_plan(&self, plan: &DeploymentPlan, detailed: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan, detailed: bool) -> Result<String> {
        let summary = plan.summary()?;
        let mut output = String::new();

        let _ = write!(output, "\nDeployment Plan: {} ({})\n", plan.stack, plan.region);
        let _ = writeln!(output, "   Plan id: {}", plan.id);
        let _ = write!(
            output,
            "   Config hash: {}\n\n",
            ConfigHasher::new().short_hash(&plan.config_hash)
        );

        let _ = writeln!(
            output,
            "VPC {} ({})",
            plan.network.vpc_name(),
            plan.network.vpc_cidr()
        );
        let rows: Vec<SubnetRow> = plan
            .network
            .subnets()
            .iter()
            .map(|subnet| SubnetRow {
                name: subnet.name(),
                tier: Self::format_tier(subnet.tier()),
                zone: subnet.availability_zone().to_string(),
                cidr: subnet.cidr_block().to_string(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            let wave_of = plan.graph.wave_of()?;
            let mut rows: Vec<ResourceRow> = plan
                .graph
                .nodes()
                .iter()
                .map(|node| ResourceRow {
                    wave: wave_of[node.id().index()],
                    kind: node.kind().to_string(),
                    name: node.name().to_string(),
                    depends_on: Self::truncate(
                        &node
                            .depends_on()
                            .iter()
                            .filter_map(|dep| plan.graph.node(*dep))
                            .map(|dep| dep.name().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                        50,
                    ),
                })
                .collect();
            rows.sort_by_key(|row| row.wave);

            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        } else {
            output.push_str("\nResources:\n");
            for (kind, count) in &summary.by_kind {
                let _ = writeln!(output, "   {count:>3} {kind}");
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} resources in {} waves across {} zone(s)\n",
            summary.resources.to_string().green(),
            summary.waves,
            summary.zones
        );

        Ok(output)
    }

    /// Formats the report of an emission.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_emission(&self, report: &EmissionReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Declared {} resources in {} waves ({} engine)\n",
                    "✓".green(),
                    report.resources.len(),
                    report.waves,
                    report.engine
                );

                if !report.exports.is_empty() {
                    let rows: Vec<ExportRow> = report
                        .exports
                        .iter()
                        .map(|(name, export)| ExportRow {
                            name: name.clone(),
                            reference: export.output.to_string(),
                            value: export
                                .value
                                .clone()
                                .unwrap_or_else(|| "(known after apply)".dimmed().to_string()),
                        })
                        .collect();
                    output.push('\n');
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                Ok(output)
            }
        }
    }

    /// Formats a subnet tier with color.
    fn format_tier(tier: SubnetTier) -> String {
        match tier {
            SubnetTier::Public => tier.as_str().green().to_string(),
            SubnetTier::Private => tier.as_str().yellow().to_string(),
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

fn to_json(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| StackError::internal(format!("Failed to serialize output: {e}")))
}
