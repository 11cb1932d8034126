// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
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

//! # vpc-stack
//!
//! A declarative planner for a standard VPC stack: public and private
//! subnets across availability zones, routing, security groups, a compute
//! instance, a managed database and a DNS record.
//!
//! ## Overview
//!
//! The planner never talks to a cloud API. It:
//!
//! - Reads the desired stack from a YAML configuration file
//! - Selects availability zones and derives one `/24` per zone and tier
//! - Builds an acyclic resource graph whose edges follow attribute references
//! - Hands the graph, in dependency order, to a provisioning engine
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, secrets and validation
//! - [`network`]: CIDR planning and zone selection
//! - [`graph`]: Resource nodes, deferred outputs and the dependency graph
//! - [`planner`]: Stack planning and declaration emission
//! - [`engine`]: Provisioning engine boundary and the bundled engines
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: webapp
//!   environment: dev
//!
//! region: us-east-1
//! vpc:
//!   name: main-vpc
//!   cidr: 10.0.0.0/16
//! gateway:
//!   name: main-igw
//! compute:
//!   ami_id: ami-0123456789abcdef0
//!   instance_type: t2.micro
//!   name_tag: webapp-instance
//! database:
//!   db_name: health
//! dns:
//!   domain: dev.example.com
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod network;
pub mod planner;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, Secrets, StackConfig};
pub use engine::{ManifestEngine, MemoryEngine, ProvisioningEngine};
pub use error::{Result, StackError};
pub use graph::{ResourceGraph, ResourceGraphBuilder, ResourceKind};
pub use network::{AvailabilityZoneSelector, CidrBlock, CidrPlanner, NetworkPlan, SubnetTier};
pub use planner::{DeclarationEmitter, DeploymentPlan, StackPlanner};
