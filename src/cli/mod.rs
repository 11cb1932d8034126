//! CLI module for the VPC stack planner.
//!
//! This module provides the command-line interface for validating, planning
//! and emitting stacks.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
