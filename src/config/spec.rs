//! Configuration specification types for the stack planner.
//!
//! This module defines all the structs that map to the `stack.yaml` file.
//! These types are declarative and fully describe the desired topology.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::network::{
    CidrBlock, DEFAULT_PRIVATE_OFFSET, DEFAULT_PUBLIC_OFFSET, DEFAULT_ZONE_CAP, SUBNET_PREFIX,
};

/// The root configuration structure for a stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// Target region.
    pub region: String,
    /// VPC configuration.
    pub vpc: VpcConfig,
    /// Internet gateway configuration.
    pub gateway: GatewayConfig,
    /// Default route of the public route table.
    #[serde(default)]
    pub public_route: PublicRouteConfig,
    /// Subnet layout settings.
    #[serde(default)]
    pub network: NetworkSettings,
    /// Security group rules.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Compute instance configuration.
    pub compute: ComputeConfig,
    /// Managed database configuration.
    pub database: DatabaseConfig,
    /// DNS record configuration.
    pub dns: DnsConfig,
    /// Static provider answers used by the offline engines.
    #[serde(default)]
    pub lookup: Option<LookupConfig>,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// VPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpcConfig {
    /// Name tag of the VPC.
    pub name: String,
    /// Address range of the VPC.
    #[serde(default = "default_vpc_cidr")]
    pub cidr: CidrBlock,
}

/// Internet gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Name tag of the gateway.
    pub name: String,
}

/// Public route configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicRouteConfig {
    /// Destination of the route to the internet gateway.
    #[serde(default = "default_any_cidr")]
    pub destination_cidr: CidrBlock,
}

/// Subnet layout settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Prefix length of every subnet. Only `/24` is supported.
    #[serde(default = "default_subnet_mask")]
    pub base_subnet_mask: u8,
    /// Maximum number of zones that host a subnet pair.
    #[serde(default = "default_max_zones")]
    pub max_zones: usize,
    /// Third-octet offset of public subnets.
    #[serde(default = "default_public_offset")]
    pub public_offset: u32,
    /// Third-octet offset of private subnets.
    #[serde(default = "default_private_offset")]
    pub private_offset: u32,
}

/// Security group configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Rules of the application security group.
    #[serde(default)]
    pub app: AppSecurityConfig,
    /// Rules of the database security group.
    #[serde(default)]
    pub database: DatabaseSecurityConfig,
}

/// Application security group rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSecurityConfig {
    /// Protocol of the ingress rules.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Source range of the ingress rules.
    #[serde(default = "default_any_cidr")]
    pub ingress_cidr: CidrBlock,
    /// Ports opened for ingress (SSH, HTTP, HTTPS, application port).
    #[serde(default = "default_ingress_ports")]
    pub ingress_ports: Vec<u16>,
    /// Egress rules.
    #[serde(default = "default_egress_rules")]
    pub egress: Vec<EgressRuleConfig>,
}

/// A single egress rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EgressRuleConfig {
    /// Protocol.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Port.
    pub port: u16,
    /// Destination range.
    #[serde(default = "default_any_cidr")]
    pub cidr: CidrBlock,
}

/// Database security group rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseSecurityConfig {
    /// Database port, opened to the application security group.
    #[serde(default = "default_database_port")]
    pub port: u16,
    /// Additional source ranges for the database port.
    #[serde(default)]
    pub allowed_cidrs: Vec<CidrBlock>,
}

/// Compute instance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputeConfig {
    /// Machine image identifier.
    pub ami_id: String,
    /// Instance type.
    pub instance_type: String,
    /// Root volume size in GB.
    #[serde(default = "default_root_volume_size")]
    pub root_volume_size: u32,
    /// Root volume type.
    #[serde(default = "default_root_volume_type")]
    pub root_volume_type: String,
    /// Name tag of the instance.
    pub name_tag: String,
    /// Name of the SSH key pair.
    #[serde(default = "default_key_name")]
    pub key_name: String,
    /// SSH public key material.
    #[serde(default)]
    pub ssh_public_key: String,
    /// Managed policies attached to the instance role.
    #[serde(default = "default_policy_arns")]
    pub policy_arns: Vec<String>,
    /// Extra commands appended to the bootstrap script.
    #[serde(default)]
    pub bootstrap_commands: Vec<String>,
}

/// Managed database configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database engine.
    #[serde(default = "default_db_engine")]
    pub engine: String,
    /// Engine version.
    #[serde(default = "default_db_engine_version")]
    pub engine_version: String,
    /// Instance class.
    #[serde(default = "default_db_instance_class")]
    pub instance_class: String,
    /// Allocated storage in GB.
    #[serde(default = "default_db_storage")]
    pub allocated_storage: u32,
    /// Parameter group family.
    #[serde(default = "default_db_parameter_family")]
    pub parameter_family: String,
    /// Name of the initial database.
    pub db_name: String,
    /// Master user name.
    #[serde(default = "default_db_username")]
    pub username: String,
    /// Environment variable holding the master password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Whether to run a standby in a second zone.
    #[serde(default)]
    pub multi_az: bool,
    /// Whether the instance gets a public address.
    #[serde(default)]
    pub publicly_accessible: bool,
    /// Whether to skip the final snapshot on deletion.
    #[serde(default = "default_true")]
    pub skip_final_snapshot: bool,
}

/// DNS record configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DnsConfig {
    /// Hosted zone domain (e.g. `dev.example.com`).
    pub domain: String,
    /// Record name, defaults to the domain itself.
    #[serde(default)]
    pub record_name: Option<String>,
    /// Record TTL in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

/// Static provider answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupConfig {
    /// Availability zones of the region, in provider order.
    #[serde(default)]
    pub availability_zones: Vec<String>,
    /// Hosted zone identifiers keyed by domain.
    #[serde(default)]
    pub hosted_zones: BTreeMap<String, String>,
}

/// Secrets resolved from the environment, never from the file.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    /// Database master password.
    pub database_password: String,
}

// Default value functions

const fn default_subnet_mask() -> u8 {
    SUBNET_PREFIX
}

const fn default_max_zones() -> usize {
    DEFAULT_ZONE_CAP
}

const fn default_public_offset() -> u32 {
    DEFAULT_PUBLIC_OFFSET
}

const fn default_private_offset() -> u32 {
    DEFAULT_PRIVATE_OFFSET
}

const fn default_database_port() -> u16 {
    3306
}

const fn default_root_volume_size() -> u32 {
    20
}

const fn default_db_storage() -> u32 {
    20
}

const fn default_ttl() -> u32 {
    60
}

const fn default_true() -> bool {
    true
}

fn default_environment() -> String {
    String::from("dev")
}

const fn default_vpc_cidr() -> CidrBlock {
    CidrBlock::DEFAULT_VPC
}

const fn default_any_cidr() -> CidrBlock {
    CidrBlock::ANY
}

fn default_protocol() -> String {
    String::from("tcp")
}

fn default_ingress_ports() -> Vec<u16> {
    vec![22, 80, 443, 8080]
}

fn default_egress_rules() -> Vec<EgressRuleConfig> {
    [3306, 443]
        .into_iter()
        .map(|port| EgressRuleConfig {
            protocol: default_protocol(),
            port,
            cidr: default_any_cidr(),
        })
        .collect()
}

fn default_root_volume_type() -> String {
    String::from("gp2")
}

fn default_key_name() -> String {
    String::from("deployer")
}

fn default_policy_arns() -> Vec<String> {
    vec![
        String::from("arn:aws:iam::aws:policy/AmazonSSMManagedInstanceCore"),
        String::from("arn:aws:iam::aws:policy/CloudWatchAgentServerPolicy"),
    ]
}

fn default_db_engine() -> String {
    String::from("mariadb")
}

fn default_db_engine_version() -> String {
    String::from("10.11.4")
}

fn default_db_instance_class() -> String {
    String::from("db.t3.micro")
}

fn default_db_parameter_family() -> String {
    String::from("mariadb10.11")
}

fn default_db_username() -> String {
    String::from("admin")
}

fn default_password_env() -> String {
    String::from("VPC_STACK_DB_PASSWORD")
}

impl Default for PublicRouteConfig {
    fn default() -> Self {
        Self {
            destination_cidr: default_any_cidr(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            base_subnet_mask: default_subnet_mask(),
            max_zones: default_max_zones(),
            public_offset: default_public_offset(),
            private_offset: default_private_offset(),
        }
    }
}

impl Default for AppSecurityConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            ingress_cidr: default_any_cidr(),
            ingress_ports: default_ingress_ports(),
            egress: default_egress_rules(),
        }
    }
}

impl Default for DatabaseSecurityConfig {
    fn default() -> Self {
        Self {
            port: default_database_port(),
            allowed_cidrs: Vec::new(),
        }
    }
}

impl StackConfig {
    /// Returns the fully qualified stack name including environment.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.project.name, self.project.environment)
    }

    /// Returns the configured lookup answers, or empty ones.
    #[must_use]
    pub fn lookup_or_default(&self) -> LookupConfig {
        self.lookup.clone().unwrap_or_default()
    }
}

impl DnsConfig {
    /// Returns the record name, falling back to the domain.
    #[must_use]
    pub fn record_name(&self) -> &str {
        self.record_name.as_deref().unwrap_or(&self.domain)
    }
}

impl Secrets {
    /// Creates a secrets bundle.
    #[must_use]
    pub fn new(database_password: impl Into<String>) -> Self {
        Self {
            database_password: database_password.into(),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("database_password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        let settings = NetworkSettings::default();
        assert_eq!(settings.base_subnet_mask, 24);
        assert_eq!(settings.max_zones, 3);
        assert_eq!(settings.public_offset, 0);
        assert_eq!(settings.private_offset, 10);
    }

    #[test]
    fn test_security_defaults() {
        let app = AppSecurityConfig::default();
        assert_eq!(app.ingress_ports, vec![22, 80, 443, 8080]);
        assert_eq!(app.ingress_cidr.to_string(), "0.0.0.0/0");
        let ports: Vec<u16> = app.egress.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![3306, 443]);
    }

    #[test]
    fn test_record_name_falls_back_to_domain() {
        let dns = DnsConfig {
            domain: String::from("dev.example.com"),
            record_name: None,
            ttl: 60,
        };
        assert_eq!(dns.record_name(), "dev.example.com");
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets::new("hunter2");
        assert!(!format!("{secrets:?}").contains("hunter2"));
    }
}
