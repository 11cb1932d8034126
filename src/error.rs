//! Error types for the VPC stack planner.
//!
//! This module provides the error hierarchy for every phase of a provisioning
//! run: configuration, address planning, graph construction, and the hand-off
//! to the external provisioning engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::network::SubnetTier;

/// The main error type for the VPC stack planner.
#[derive(Debug, Error)]
pub enum StackError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Address planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Resource graph errors.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Provisioning engine errors.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

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

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A CIDR string could not be parsed.
    #[error("Invalid CIDR block '{value}': {reason}")]
    InvalidCidr {
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Address planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The tier offset plus the subnet index leaves the usable third-octet range.
    #[error("Address space exhausted: {tier} subnet index {index} with offset {offset} exceeds the usable range")]
    AddressSpaceExhausted {
        /// Tier of the requested subnet.
        tier: SubnetTier,
        /// Requested subnet index.
        index: u32,
        /// Tier offset.
        offset: u32,
    },

    /// The region reported no usable availability zones.
    #[error("No availability zones available in region {region}")]
    NoZonesAvailable {
        /// Region that was queried.
        region: String,
    },

    /// The database tier needs at least one private subnet.
    #[error("Database tier requires at least one private subnet, found {available}")]
    InsufficientPrivateSubnets {
        /// Number of private subnets in the plan.
        available: usize,
    },

    /// The compute tier needs a public subnet to be placed in.
    #[error("Compute instance requires a public subnet, none were planned")]
    MissingPublicSubnet,

    /// An upstream reference could not be resolved.
    #[error("Failed to resolve dependency '{dependency}': {message}")]
    DependencyResolutionFailure {
        /// The dependency that could not be resolved.
        dependency: String,
        /// Description of the failure.
        message: String,
    },

    /// A planned subnet does not fit inside the VPC.
    #[error("Subnet {cidr} is not contained in VPC {vpc}")]
    SubnetOutsideVpc {
        /// The subnet block.
        cidr: String,
        /// The VPC block.
        vpc: String,
    },

    /// Two planned subnets share addresses.
    #[error("Subnets {first} and {second} overlap")]
    OverlappingSubnets {
        /// First overlapping block.
        first: String,
        /// Second overlapping block.
        second: String,
    },
}

/// Resource graph errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node referenced a resource that is not in the graph.
    #[error("Unknown resource reference: #{id} (from '{from}')")]
    UnknownResource {
        /// Index of the missing resource.
        id: usize,
        /// Name of the referencing node.
        from: String,
    },

    /// Two nodes of the same kind share a name.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName {
        /// Kind of the resource.
        kind: String,
        /// The duplicated name.
        name: String,
    },

    /// The graph contains a dependency cycle.
    #[error("Dependency cycle detected involving: {nodes}")]
    CycleDetected {
        /// Names of nodes left unordered.
        nodes: String,
    },

    /// The graph does not have exactly one VPC root.
    #[error("Invalid graph root: {message}")]
    InvalidRoot {
        /// Description of the root problem.
        message: String,
    },

    /// A node has no dependency path to the root.
    #[error("Resource '{name}' has no dependency path to the VPC")]
    Unreachable {
        /// Name of the detached node.
        name: String,
    },
}

/// Provisioning engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine refused a declaration.
    #[error("Failed to declare {kind} '{name}': {message}")]
    DeclarationFailed {
        /// Kind of the resource.
        kind: String,
        /// Name of the resource.
        name: String,
        /// Reason given by the engine.
        message: String,
    },

    /// The same resource was declared twice in one run.
    #[error("Resource {urn} was already declared")]
    DuplicateDeclaration {
        /// URN of the resource.
        urn: String,
    },

    /// A provider lookup failed.
    #[error("Lookup of {what} failed: {message}")]
    LookupFailed {
        /// What was being looked up.
        what: String,
        /// Description of the failure.
        message: String,
    },

    /// The declaration manifest could not be written.
    #[error("Failed to write manifest {path}: {message}")]
    ManifestWrite {
        /// Target manifest path.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for VPC stack operations.
pub type Result<T> = std::result::Result<T, StackError>;

impl StackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl PlanError {
    /// Creates a dependency resolution failure.
    #[must_use]
    pub fn unresolved(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DependencyResolutionFailure {
            dependency: dependency.into(),
            message: message.into(),
        }
    }
}

impl EngineError {
    /// Creates a lookup error.
    #[must_use]
    pub fn lookup(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            what: what.into(),
            message: message.into(),
        }
    }
}
