//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// vpc-stack - Declarative VPC stack planner.
#[derive(Parser, Debug)]
#[command(name = "vpc-stack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "VPC_STACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stack configuration.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the stack configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Build and display the deployment plan.
    Plan {
        /// List every resource with its wave and dependencies.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Render the resource graph in Graphviz DOT format.
    Graph {
        /// Write to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit the plan to the manifest engine.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Manifest path (defaults to `.vpc-stack/manifest.json` next to the config).
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "vpc-stack",
            "--config",
            "stack.yaml",
            "--output",
            "json",
            "apply",
            "--yes",
            "--manifest",
            "out.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("stack.yaml")));
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Apply { yes, manifest } => {
                assert!(yes);
                assert_eq!(manifest, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_plan_defaults() {
        let cli = Cli::try_parse_from(["vpc-stack", "plan"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(matches!(cli.command, Commands::Plan { detailed: false }));
    }
}
