//! Configuration validation for stack specs.
//!
//! This module checks a parsed [`StackConfig`] before any planning happens,
//! so that address-space and naming problems surface with a field path
//! instead of halfway through graph construction.

use crate::error::{ConfigError, Result, StackError};
use crate::network::{CidrBlock, MAX_VPC_PREFIX, SUBNET_PREFIX, THIRD_OCTET_LIMIT};
use std::collections::HashSet;
use std::ops::Range;
use tracing::debug;

use super::spec::{
    AppSecurityConfig, ComputeConfig, DatabaseConfig, DnsConfig, NetworkSettings, ProjectConfig,
    StackConfig,
};

/// Port that triggers the open-SSH warning.
const SSH_PORT: u16 = 22;

/// Validator for stack configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &StackConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!(
                "Configuration validation passed with {} warning(s)",
                result.warnings.len()
            );
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StackError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Runs every check and returns the collected result without failing.
    #[must_use]
    pub fn check(&self, config: &StackConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_project(&config.project, &mut result);
        Self::validate_topology(config, &mut result);
        Self::validate_network(&config.vpc.cidr, &config.network, &mut result);
        Self::validate_security(&config.security.app, config.security.database.port, &mut result);
        Self::validate_compute(&config.compute, &mut result);
        Self::validate_database(&config.database, &mut result);
        Self::validate_dns(&config.dns, &mut result);

        result
    }

    /// Validates project configuration.
    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.name.is_empty() {
            result.error("project.name", "Project name cannot be empty");
        } else if !is_valid_name(&project.name) {
            result.error(
                "project.name",
                format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name
                ),
            );
        }

        if project.environment.is_empty() {
            result.error("project.environment", "Environment cannot be empty");
        }
    }

    /// Validates region and the names of the network resources.
    fn validate_topology(config: &StackConfig, result: &mut ValidationResult) {
        if config.region.trim().is_empty() {
            result.error("region", "Region cannot be empty");
        }

        for (field, name) in [
            ("vpc.name", &config.vpc.name),
            ("gateway.name", &config.gateway.name),
        ] {
            if !is_valid_name(name) {
                result.error(
                    field,
                    format!(
                        "Name '{name}' is invalid. Must be lowercase alphanumeric with hyphens."
                    ),
                );
            }
        }

        if config.vpc.name == config.gateway.name {
            result
                .warnings
                .push(format!("vpc.name and gateway.name are both '{}'", config.vpc.name));
        }
    }

    /// Validates the subnet layout against the VPC block.
    fn validate_network(vpc: &CidrBlock, network: &NetworkSettings, result: &mut ValidationResult) {
        if vpc.prefix() > MAX_VPC_PREFIX {
            result.error(
                "vpc.cidr",
                format!(
                    "VPC prefix /{} is too small, at most /{MAX_VPC_PREFIX} is supported",
                    vpc.prefix()
                ),
            );
        }

        if network.base_subnet_mask != SUBNET_PREFIX {
            result.error(
                "network.base_subnet_mask",
                format!(
                    "Only /{SUBNET_PREFIX} subnets are supported, got /{}",
                    network.base_subnet_mask
                ),
            );
        }

        if network.max_zones == 0 {
            result.error("network.max_zones", "At least one zone is required");
            return;
        }

        let Ok(zones) = u32::try_from(network.max_zones) else {
            result.error("network.max_zones", "Zone cap is out of range");
            return;
        };

        let public = tier_range(network.public_offset, zones);
        let private = tier_range(network.private_offset, zones);

        for (field, range) in [
            ("network.public_offset", &public),
            ("network.private_offset", &private),
        ] {
            if range.end > THIRD_OCTET_LIMIT {
                result.error(
                    field,
                    format!(
                        "Offset {} with {zones} zone(s) reaches third octet {}, limit is {}",
                        range.start,
                        range.end - 1,
                        THIRD_OCTET_LIMIT - 1
                    ),
                );
            }
        }

        if public.start < private.end && private.start < public.end {
            result.error(
                "network.private_offset",
                format!(
                    "Public octets {}..{} and private octets {}..{} overlap",
                    public.start, public.end, private.start, private.end
                ),
            );
        }
    }

    /// Validates the security group rules.
    fn validate_security(app: &AppSecurityConfig, db_port: u16, result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, port) in app.ingress_ports.iter().enumerate() {
            if *port == 0 {
                result.error(
                    format!("security.app.ingress_ports[{i}]"),
                    "Port must be between 1 and 65535",
                );
            } else if !seen.insert(*port) {
                result.error(
                    format!("security.app.ingress_ports[{i}]"),
                    format!("Duplicate ingress port {port}"),
                );
            }
        }

        for (i, rule) in app.egress.iter().enumerate() {
            if rule.port == 0 {
                result.error(
                    format!("security.app.egress[{i}].port"),
                    "Port must be between 1 and 65535",
                );
            }
        }

        if db_port == 0 {
            result.error("security.database.port", "Port must be between 1 and 65535");
        }

        if app.ingress_cidr == CidrBlock::ANY && seen.contains(&SSH_PORT) {
            result.warnings.push(String::from(
                "security.app: SSH is open to 0.0.0.0/0, consider restricting ingress_cidr",
            ));
        }
    }

    /// Validates compute configuration.
    fn validate_compute(compute: &ComputeConfig, result: &mut ValidationResult) {
        if compute.ami_id.trim().is_empty() {
            result.error("compute.ami_id", "AMI id cannot be empty");
        }

        if compute.instance_type.trim().is_empty() {
            result.error("compute.instance_type", "Instance type cannot be empty");
        }

        if compute.name_tag.trim().is_empty() {
            result.error("compute.name_tag", "Name tag cannot be empty");
        }

        if compute.key_name.trim().is_empty() {
            result.error("compute.key_name", "Key pair name cannot be empty");
        }

        if compute.root_volume_size == 0 {
            result.error("compute.root_volume_size", "Root volume size must be at least 1 GB");
        }

        if compute.ssh_public_key.trim().is_empty() {
            result.warnings.push(String::from(
                "compute.ssh_public_key: No SSH public key configured, the key pair will be empty",
            ));
        }
    }

    /// Validates database configuration.
    fn validate_database(database: &DatabaseConfig, result: &mut ValidationResult) {
        for (field, value) in [
            ("database.engine", &database.engine),
            ("database.instance_class", &database.instance_class),
            ("database.parameter_family", &database.parameter_family),
            ("database.db_name", &database.db_name),
            ("database.username", &database.username),
            ("database.password_env", &database.password_env),
        ] {
            if value.trim().is_empty() {
                result.error(field, "Value cannot be empty");
            }
        }

        if database.allocated_storage == 0 {
            result.error("database.allocated_storage", "Allocated storage must be at least 1 GB");
        }

        if database.publicly_accessible {
            result.warnings.push(String::from(
                "database.publicly_accessible: The database will get a public address",
            ));
        }
    }

    /// Validates DNS configuration.
    fn validate_dns(dns: &DnsConfig, result: &mut ValidationResult) {
        if dns.domain.trim().is_empty() {
            result.error("dns.domain", "Domain cannot be empty");
        }

        if dns.ttl == 0 {
            result.error("dns.ttl", "TTL must be at least 1 second");
        }
    }
}

/// Third octets used by one tier.
const fn tier_range(offset: u32, zones: u32) -> Range<u32> {
    offset..offset.saturating_add(zones)
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    if !first.is_ascii_lowercase() {
        return false;
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    /// Records an error for a field.
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
