//! Configuration module for the VPC stack planner.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `stack.yaml`
//! - Resolving secrets from the environment
//! - Validation of configuration values
//! - Computing configuration hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    AppSecurityConfig, ComputeConfig, DatabaseConfig, DatabaseSecurityConfig, DnsConfig,
    EgressRuleConfig, GatewayConfig, LookupConfig, NetworkSettings, ProjectConfig,
    PublicRouteConfig, Secrets, SecurityConfig, StackConfig, VpcConfig,
};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::ConfigHasher;
