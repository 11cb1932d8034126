//! Configuration parser for loading stack configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StackError};
use std::path::Path;
use tracing::{debug, info};

use super::spec::{StackConfig, Secrets};

/// Configuration parser for loading stack configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StackError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackConfig> {
        debug!("Parsing YAML configuration");

        let config: StackConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StackError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for project: {}", config.project.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `VPC_STACK_<KEY>` (e.g., `VPC_STACK_REGION`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_overrides(&mut config, |key| std::env::var(key).ok());

        Ok(config)
    }

    /// Applies overrides from a variable source to the configuration.
    fn apply_overrides(config: &mut StackConfig, var: impl Fn(&str) -> Option<String>) {
        if let Some(name) = var("VPC_STACK_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Some(env) = var("VPC_STACK_ENVIRONMENT") {
            debug!("Overriding project.environment from environment");
            config.project.environment = env;
        }

        if let Some(region) = var("VPC_STACK_REGION") {
            debug!("Overriding region from environment");
            config.region = region;
        }

        if let Some(key) = var("VPC_STACK_SSH_PUBLIC_KEY") {
            debug!("Overriding compute.ssh_public_key from environment");
            config.compute.ssh_public_key = key;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves secrets named by the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database password variable is not set.
    pub fn load_secrets(config: &StackConfig) -> Result<Secrets> {
        Self::resolve_secrets(config, |key| std::env::var(key).ok())
    }

    /// Resolves secrets from a variable source.
    fn resolve_secrets(
        config: &StackConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Secrets> {
        let name = &config.database.password_env;
        let password = var(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                StackError::Config(ConfigError::MissingEnvVar {
                    name: name.clone(),
                })
            })?;

        Ok(Secrets::new(password))
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "stack.yaml",
    "stack.yml",
    "vpc-stack.yaml",
    "vpc-stack.yml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MINIMAL_YAML;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(MINIMAL_YAML, None).unwrap();

        assert_eq!(config.project.name, "webapp");
        assert_eq!(config.project.environment, "dev");
        assert_eq!(config.vpc.cidr.to_string(), "10.0.0.0/16");
        assert_eq!(config.public_route.destination_cidr.to_string(), "0.0.0.0/0");
        assert_eq!(config.network.max_zones, 3);
        assert_eq!(config.database.engine, "mariadb");
        assert_eq!(config.database.password_env, "VPC_STACK_DB_PASSWORD");
        assert_eq!(config.dns.ttl, 60);
        assert_eq!(config.lookup_or_default().availability_zones.len(), 4);
        assert_eq!(config.qualified_name(), "webapp-dev");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
project:
  name: webapp
  environment: prod
region: eu-west-1
vpc:
  name: prod-vpc
  cidr: 172.31.0.0/16
gateway:
  name: prod-igw
public_route:
  destination_cidr: 0.0.0.0/0
network:
  base_subnet_mask: 24
  max_zones: 2
  public_offset: 0
  private_offset: 20
security:
  app:
    protocol: tcp
    ingress_cidr: 203.0.113.0/24
    ingress_ports: [22, 443]
    egress:
      - port: 5432
  database:
    port: 5432
    allowed_cidrs: [10.0.0.0/8]
compute:
  ami_id: ami-0123456789abcdef0
  instance_type: t3.small
  root_volume_size: 30
  root_volume_type: gp3
  name_tag: prod-app
  key_name: ops
  ssh_public_key: "ssh-ed25519 AAAA ops@example"
  policy_arns: []
database:
  engine: postgres
  engine_version: "16.1"
  instance_class: db.t3.small
  allocated_storage: 50
  parameter_family: postgres16
  db_name: app
  username: app
  password_env: APP_DB_PASSWORD
  multi_az: true
dns:
  domain: example.com.
  record_name: app.example.com
  ttl: 300
"#;
        let config = ConfigParser::new().parse_yaml(yaml, None).unwrap();

        assert_eq!(config.vpc.cidr.to_string(), "172.31.0.0/16");
        assert_eq!(config.network.private_offset, 20);
        assert_eq!(config.security.app.ingress_ports, vec![22, 443]);
        assert_eq!(config.security.app.egress[0].protocol, "tcp");
        assert_eq!(config.security.database.allowed_cidrs.len(), 1);
        assert!(config.compute.policy_arns.is_empty());
        assert!(config.database.multi_az);
        assert_eq!(config.dns.record_name(), "app.example.com");
        assert!(config.lookup.is_none());
    }

    #[test]
    fn test_invalid_cidr_is_a_parse_error() {
        let yaml = MINIMAL_YAML.replace(
            "  name: main-vpc",
            "  name: main-vpc\n  cidr: 10.0.0.1/16",
        );
        let result = ConfigParser::new().parse_yaml(&yaml, None);
        assert!(matches!(
            result,
            Err(StackError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = ConfigParser::new().parse_yaml(MINIMAL_YAML, None).unwrap();
        let vars: HashMap<&str, &str> = [
            ("VPC_STACK_REGION", "eu-central-1"),
            ("VPC_STACK_ENVIRONMENT", "staging"),
        ]
        .into_iter()
        .collect();

        ConfigParser::apply_overrides(&mut config, |key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.project.environment, "staging");
        assert_eq!(config.project.name, "webapp");
    }

    #[test]
    fn test_secrets_resolution() {
        let config = ConfigParser::new().parse_yaml(MINIMAL_YAML, None).unwrap();

        let secrets = ConfigParser::resolve_secrets(&config, |key| {
            (key == "VPC_STACK_DB_PASSWORD").then(|| String::from("s3cret"))
        })
        .unwrap();
        assert_eq!(secrets.database_password, "s3cret");

        let missing = ConfigParser::resolve_secrets(&config, |_| None);
        assert!(matches!(
            missing,
            Err(StackError::Config(ConfigError::MissingEnvVar { .. }))
        ));
    }

    #[test]
    fn test_load_file_and_find() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("stack.yaml"), MINIMAL_YAML).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("stack.yaml"));

        let config = ConfigParser::new().load_file(&found).unwrap();
        assert_eq!(config.gateway.name, "main-igw");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let result = ConfigParser::new().load_file(dir.path().join("nope.yaml"));
        assert!(matches!(
            result,
            Err(StackError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
