//! Stack planning: lookups, address plan, resource graph.

use tracing::{debug, info, warn};

use crate::config::{ConfigHasher, ConfigValidator, Secrets, StackConfig};
use crate::engine::ProvisioningEngine;
use crate::error::{PlanError, Result, StackError};
use crate::graph::{ResolvedInputs, ResourceGraphBuilder};
use crate::network::{AvailabilityZoneSelector, CidrPlanner, NetworkPlan};

use super::plan::DeploymentPlan;

/// Planner turning a configuration into a [`DeploymentPlan`].
#[derive(Debug)]
pub struct StackPlanner<'a> {
    config: &'a StackConfig,
    secrets: &'a Secrets,
}

impl<'a> StackPlanner<'a> {
    /// Creates a planner for a configuration.
    #[must_use]
    pub const fn new(config: &'a StackConfig, secrets: &'a Secrets) -> Self {
        Self { config, secrets }
    }

    /// Plans the stack.
    ///
    /// The two provider lookups run concurrently; graph construction only
    /// starts once both have answered.
    ///
    /// # Errors
    ///
    /// Returns `DependencyResolutionFailure` if a lookup fails, or the first
    /// validation, address planning or graph error.
    pub async fn plan<E>(&self, engine: &E) -> Result<DeploymentPlan>
    where
        E: ProvisioningEngine + ?Sized,
    {
        let config = self.config;

        let validation = ConfigValidator::new().validate(config)?;
        for warning in &validation.warnings {
            warn!("{warning}");
        }

        info!(
            "Planning stack {} in {} with the {} engine",
            config.qualified_name(),
            config.region,
            engine.engine_type()
        );

        let (zones, hosted_zone_id) = tokio::try_join!(
            async {
                engine
                    .lookup_availability_zones(&config.region)
                    .await
                    .map_err(|e| {
                        unresolved(&format!("availability zones of {}", config.region), &e)
                    })
            },
            async {
                engine
                    .lookup_hosted_zone(&config.dns.domain)
                    .await
                    .map_err(|e| unresolved(&format!("hosted zone of {}", config.dns.domain), &e))
            },
        )?;
        debug!("Resolved {} zone(s) and hosted zone {hosted_zone_id}", zones.len());

        let slots = AvailabilityZoneSelector::new(config.network.max_zones)
            .select(&config.region, &zones)?;
        let planner = CidrPlanner::for_vpc(&config.vpc.cidr, &config.network)?;
        let network = NetworkPlan::build(
            &config.vpc.name,
            config.vpc.cidr,
            &config.gateway.name,
            &planner,
            &slots,
        )?;

        let inputs = ResolvedInputs {
            hosted_zone_id,
            secrets: self.secrets.clone(),
        };
        let stack = ResourceGraphBuilder::new(config, &network, &inputs).build()?;

        let config_hash = ConfigHasher::new().hash_config(config)?;
        let plan = DeploymentPlan::new(
            config.qualified_name(),
            config.region.clone(),
            config_hash,
            network,
            stack,
        );

        info!("Plan {} ready: {} resources", plan.id, plan.resource_count());
        Ok(plan)
    }
}

/// Wraps a lookup failure.
fn unresolved(dependency: &str, error: &StackError) -> StackError {
    PlanError::unresolved(dependency, error.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, MockProvisioningEngine};
    use crate::error::EngineError;
    use crate::graph::ResourceKind;
    use crate::testing::{config_with_zones, test_config, test_secrets};

    #[tokio::test]
    async fn test_plan_four_zones() {
        let config = test_config();
        let secrets = test_secrets();
        let engine = MemoryEngine::from_config(&config);

        let plan = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap();

        let public: Vec<String> = plan
            .network
            .public_subnets()
            .map(|s| s.cidr_block().to_string())
            .collect();
        assert_eq!(public, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);
        assert_eq!(plan.network.private_subnets().count(), 3);
        assert_eq!(plan.stack, "webapp-dev");
        assert_eq!(plan.config_hash.len(), 64);
        plan.graph.validate().unwrap();

        // planning declares nothing
        assert!(engine.declarations().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_zones() {
        let config = config_with_zones(&[]);
        let secrets = test_secrets();
        let engine = MemoryEngine::from_config(&config);

        let err = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::NoZonesAvailable { .. })));
    }

    #[tokio::test]
    async fn test_single_zone() {
        let config = config_with_zones(&["us-east-1a"]);
        let secrets = test_secrets();
        let engine = MemoryEngine::from_config(&config);

        let plan = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap();
        assert_eq!(plan.network.zone_count(), 1);
        assert_eq!(plan.graph.nodes_of_kind(ResourceKind::Subnet).count(), 2);
    }

    #[tokio::test]
    async fn test_missing_hosted_zone_is_unresolved() {
        let mut config = test_config();
        config.dns.domain = String::from("other.example.org");
        let secrets = test_secrets();
        let engine = MemoryEngine::from_config(&config);

        let err = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap_err();
        assert!(matches!(
            err,
            StackError::Plan(PlanError::DependencyResolutionFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_failure_declares_nothing() {
        let config = test_config();
        let secrets = test_secrets();
        let mut engine = MockProvisioningEngine::new();
        engine.expect_engine_type().return_const("mock");
        engine
            .expect_lookup_availability_zones()
            .returning(|_| Err(EngineError::lookup("availability zones", "throttled").into()));
        engine
            .expect_lookup_hosted_zone()
            .returning(|_| Ok(String::from("Z1")));
        engine.expect_declare_resource().times(0);
        engine.expect_commit().times(0);

        let err = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap_err();
        match err {
            StackError::Plan(PlanError::DependencyResolutionFailure { dependency, message }) => {
                assert_eq!(dependency, "availability zones of us-east-1");
                assert!(message.contains("throttled"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_lookups() {
        let mut config = test_config();
        config.network.base_subnet_mask = 16;
        let secrets = test_secrets();
        let mut engine = MockProvisioningEngine::new();
        engine.expect_lookup_availability_zones().times(0);
        engine.expect_lookup_hosted_zone().times(0);

        let err = StackPlanner::new(&config, &secrets).plan(&engine).await.unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }
}
