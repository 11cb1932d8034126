//! Configuration hashing for change detection.
//!
//! The fingerprint is stored in every plan and manifest so that two runs
//! over the same configuration can be recognised as identical.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, StackError};

use super::spec::StackConfig;

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire stack configuration.
    ///
    /// Secrets live outside [`StackConfig`] and never take part in the hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn hash_config(&self, config: &StackConfig) -> Result<String> {
        let mut hasher = Sha256::new();

        hasher.update(config.project.name.as_bytes());
        hasher.update(config.project.environment.as_bytes());
        hasher.update(config.region.as_bytes());
        hasher.update(self.hash_section(config)?.as_bytes());

        Ok(hex::encode(hasher.finalize()))
    }

    /// Computes a hash for any serializable section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the section cannot be serialized.
    pub fn hash_section<T: Serialize>(&self, section: &T) -> Result<String> {
        let bytes = serde_json::to_vec(section)
            .map_err(|e| StackError::internal(format!("Failed to serialize section: {e}")))?;

        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;

    #[test]
    fn test_config_hash_deterministic() {
        let hasher = ConfigHasher::new();
        let config = test_config();

        let hash1 = hasher.hash_config(&config).unwrap();
        let hash2 = hasher.hash_config(&config.clone()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_network_change_changes_hash() {
        let hasher = ConfigHasher::new();
        let config = test_config();
        let mut changed = config.clone();
        changed.network.private_offset = 20;

        assert_ne!(
            hasher.hash_config(&config).unwrap(),
            hasher.hash_config(&changed).unwrap()
        );
        assert_ne!(
            hasher.hash_section(&config.network).unwrap(),
            hasher.hash_section(&changed.network).unwrap()
        );
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let short = hasher.short_hash("abcdef1234567890abcdef1234567890");

        assert_eq!(short, "abcdef12");
    }
}
