//! Shared test fixtures.

use crate::config::{ConfigParser, Secrets, StackConfig};

/// Smallest configuration that plans a full stack over four zones.
pub const MINIMAL_YAML: &str = r"
project:
  name: webapp
region: us-east-1
vpc:
  name: main-vpc
gateway:
  name: main-igw
compute:
  ami_id: ami-0123456789abcdef0
  instance_type: t2.micro
  name_tag: webapp-instance
database:
  db_name: health
dns:
  domain: dev.example.com
lookup:
  availability_zones: [us-east-1a, us-east-1b, us-east-1c, us-east-1d]
  hosted_zones:
    dev.example.com: Z0123456789
";

/// Parses [`MINIMAL_YAML`].
pub fn test_config() -> StackConfig {
    ConfigParser::new()
        .parse_yaml(MINIMAL_YAML, None)
        .expect("fixture config parses")
}

/// Returns a configuration whose lookup section lists the given zones.
pub fn config_with_zones(zones: &[&str]) -> StackConfig {
    let mut config = test_config();
    if let Some(lookup) = config.lookup.as_mut() {
        lookup.availability_zones = zones.iter().map(|z| (*z).to_string()).collect();
    }
    config
}

/// Secrets used by every planning test.
pub fn test_secrets() -> Secrets {
    Secrets::new("test-password")
}
