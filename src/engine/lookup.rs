//! Provider lookups answered from configuration.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::LookupConfig;
use crate::error::{EngineError, Result};

/// Static availability-zone and hosted-zone answers for offline engines.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    zones: Vec<String>,
    hosted_zones: BTreeMap<String, String>,
}

/// Lowercases a domain and strips the trailing root dot.
fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl StaticLookup {
    /// Creates a lookup from explicit answers.
    #[must_use]
    pub fn new(zones: Vec<String>, hosted_zones: BTreeMap<String, String>) -> Self {
        Self {
            zones,
            hosted_zones: hosted_zones
                .into_iter()
                .map(|(domain, id)| (normalize_domain(&domain), id))
                .collect(),
        }
    }

    /// Returns the availability zones of `region`.
    #[must_use]
    pub fn availability_zones(&self, region: &str) -> Vec<String> {
        debug!("Static lookup: {} zone(s) for {region}", self.zones.len());
        self.zones.clone()
    }

    /// Returns the hosted zone id for `domain`.
    ///
    /// # Errors
    ///
    /// Returns `LookupFailed` if no hosted zone is known for the domain.
    pub fn hosted_zone(&self, domain: &str) -> Result<String> {
        self.hosted_zones
            .get(&normalize_domain(domain))
            .cloned()
            .ok_or_else(|| {
                EngineError::lookup("hosted zone", format!("no hosted zone found for {domain}"))
                    .into()
            })
    }
}

impl From<&LookupConfig> for StaticLookup {
    fn from(config: &LookupConfig) -> Self {
        Self::new(config.availability_zones.clone(), config.hosted_zones.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_zone_ignores_trailing_dot_and_case() {
        let lookup = StaticLookup::new(
            Vec::new(),
            BTreeMap::from([(String::from("Dev.Example.com."), String::from("Z1"))]),
        );

        assert_eq!(lookup.hosted_zone("dev.example.com").unwrap(), "Z1");
        assert_eq!(lookup.hosted_zone("dev.example.com.").unwrap(), "Z1");
        assert!(lookup.hosted_zone("example.org").is_err());
    }

    #[test]
    fn test_empty_lookup() {
        let lookup = StaticLookup::default();
        assert!(lookup.availability_zones("us-east-1").is_empty());
    }
}
