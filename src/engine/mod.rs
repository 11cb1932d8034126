//! Provisioning engine boundary.
//!
//! The planner never creates cloud resources itself. It hands ordered
//! declarations to a [`ProvisioningEngine`], which is also the only place
//! where provider lookups happen and where deferred outputs get a value.

mod lookup;
mod manifest;
mod memory;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use lookup::StaticLookup;
pub use manifest::{ManifestEngine, MANIFEST_VERSION};
pub use memory::MemoryEngine;
pub use types::{urn, DeclaredValue, HandleOutput, ResourceDeclaration, ResourceHandle};

/// Trait for engines that materialize declared resources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Declares one resource. Called once per resource, dependencies first.
    async fn declare_resource(&self, declaration: ResourceDeclaration) -> Result<ResourceHandle>;

    /// Lists the availability zones of a region, in provider order.
    async fn lookup_availability_zones(&self, region: &str) -> Result<Vec<String>>;

    /// Finds the hosted zone id for a domain.
    async fn lookup_hosted_zone(&self, domain: &str) -> Result<String>;

    /// Returns the value of a deferred output, if the engine knows it.
    async fn resolve_output(&self, output: &HandleOutput) -> Result<Option<String>> {
        let _ = output;
        Ok(None)
    }

    /// Finishes a run after every declaration succeeded.
    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    /// Discards a run after a failed declaration.
    async fn abort(&self) {}

    /// Gets the engine type name.
    fn engine_type(&self) -> &'static str;
}

#[async_trait]
impl ProvisioningEngine for Box<dyn ProvisioningEngine> {
    async fn declare_resource(&self, declaration: ResourceDeclaration) -> Result<ResourceHandle> {
        (**self).declare_resource(declaration).await
    }

    async fn lookup_availability_zones(&self, region: &str) -> Result<Vec<String>> {
        (**self).lookup_availability_zones(region).await
    }

    async fn lookup_hosted_zone(&self, domain: &str) -> Result<String> {
        (**self).lookup_hosted_zone(domain).await
    }

    async fn resolve_output(&self, output: &HandleOutput) -> Result<Option<String>> {
        (**self).resolve_output(output).await
    }

    async fn commit(&self) -> Result<()> {
        (**self).commit().await
    }

    async fn abort(&self) {
        (**self).abort().await;
    }

    fn engine_type(&self) -> &'static str {
        (**self).engine_type()
    }
}
