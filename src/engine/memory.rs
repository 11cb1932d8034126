//! In-memory engine for dry runs and tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::error::{EngineError, Result};

use super::lookup::StaticLookup;
use super::types::{HandleOutput, ResourceDeclaration, ResourceHandle};
use super::ProvisioningEngine;

/// Engine that records declarations without creating anything.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    lookup: StaticLookup,
    outputs: HashMap<HandleOutput, String>,
    run: Mutex<MemoryRun>,
}

#[derive(Debug, Default)]
struct MemoryRun {
    declarations: Vec<ResourceDeclaration>,
    urns: HashSet<String>,
    committed: bool,
    aborted: bool,
}

impl MemoryEngine {
    /// Creates an engine answering lookups from `lookup`.
    #[must_use]
    pub fn new(lookup: StaticLookup) -> Self {
        Self {
            lookup,
            ..Self::default()
        }
    }

    /// Creates an engine answering lookups from the configuration.
    #[must_use]
    pub fn from_config(config: &StackConfig) -> Self {
        Self::new(StaticLookup::from(&config.lookup_or_default()))
    }

    /// Pre-seeds the value of an output, reported once the run is committed.
    #[must_use]
    pub fn with_output(mut self, output: HandleOutput, value: impl Into<String>) -> Self {
        self.outputs.insert(output, value.into());
        self
    }

    /// Returns the recorded declarations in call order.
    pub async fn declarations(&self) -> Vec<ResourceDeclaration> {
        self.run.lock().await.declarations.clone()
    }

    /// Returns true once `commit` succeeded.
    pub async fn is_committed(&self) -> bool {
        self.run.lock().await.committed
    }

    /// Returns true if the run was aborted.
    pub async fn was_aborted(&self) -> bool {
        self.run.lock().await.aborted
    }
}

#[async_trait]
impl ProvisioningEngine for MemoryEngine {
    async fn declare_resource(&self, declaration: ResourceDeclaration) -> Result<ResourceHandle> {
        let mut run = self.run.lock().await;
        let handle = declaration.handle();

        if run.urns.contains(&handle.urn) {
            return Err(EngineError::DuplicateDeclaration { urn: handle.urn }.into());
        }

        if let Some(missing) = declaration
            .depends_on
            .iter()
            .find(|dep| !run.urns.contains(&dep.urn))
        {
            return Err(EngineError::DeclarationFailed {
                kind: declaration.kind.to_string(),
                name: declaration.name.clone(),
                message: format!("dependency {missing} has not been declared"),
            }
            .into());
        }

        debug!("Recorded {} (wave {})", handle.urn, declaration.wave);
        run.urns.insert(handle.urn.clone());
        run.declarations.push(declaration);

        Ok(handle)
    }

    async fn lookup_availability_zones(&self, region: &str) -> Result<Vec<String>> {
        Ok(self.lookup.availability_zones(region))
    }

    async fn lookup_hosted_zone(&self, domain: &str) -> Result<String> {
        self.lookup.hosted_zone(domain)
    }

    async fn resolve_output(&self, output: &HandleOutput) -> Result<Option<String>> {
        if !self.run.lock().await.committed {
            return Ok(None);
        }
        Ok(self.outputs.get(output).cloned())
    }

    async fn commit(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        run.committed = true;
        info!("Memory engine committed {} declaration(s)", run.declarations.len());
        Ok(())
    }

    async fn abort(&self) {
        let mut run = self.run.lock().await;
        run.declarations.clear();
        run.urns.clear();
        run.aborted = true;
    }

    fn engine_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::graph::ResourceKind;
    use std::collections::BTreeMap;

    fn declaration(
        kind: ResourceKind,
        name: &str,
        depends_on: Vec<ResourceHandle>,
    ) -> ResourceDeclaration {
        ResourceDeclaration {
            kind,
            name: name.to_string(),
            properties: BTreeMap::new(),
            depends_on,
            wave: 0,
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let engine = MemoryEngine::default();
        let vpc = engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![]))
            .await
            .unwrap();
        engine
            .declare_resource(declaration(ResourceKind::Subnet, "public-subnet-0", vec![vpc]))
            .await
            .unwrap();

        let names: Vec<String> = engine.declarations().await.into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["main", "public-subnet-0"]);
        assert!(!engine.is_committed().await);
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_undeclared_dependencies() {
        let engine = MemoryEngine::default();
        engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![]))
            .await
            .unwrap();

        let duplicate = engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![]))
            .await;
        assert!(matches!(
            duplicate,
            Err(StackError::Engine(EngineError::DuplicateDeclaration { .. }))
        ));

        let ghost = ResourceHandle::new(ResourceKind::InternetGateway, "igw");
        let orphan = engine
            .declare_resource(declaration(ResourceKind::Route, "r", vec![ghost]))
            .await;
        assert!(matches!(
            orphan,
            Err(StackError::Engine(EngineError::DeclarationFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_outputs_resolve_after_commit() {
        let handle = ResourceHandle::new(ResourceKind::Instance, "web");
        let engine =
            MemoryEngine::default().with_output(handle.output("public_ip"), "203.0.113.10");

        engine
            .declare_resource(declaration(ResourceKind::Instance, "web", vec![]))
            .await
            .unwrap();
        assert_eq!(engine.resolve_output(&handle.output("public_ip")).await.unwrap(), None);

        engine.commit().await.unwrap();
        assert_eq!(
            engine.resolve_output(&handle.output("public_ip")).await.unwrap().as_deref(),
            Some("203.0.113.10")
        );
        assert_eq!(engine.resolve_output(&handle.output("id")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_abort_discards_declarations() {
        let engine = MemoryEngine::default();
        engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![]))
            .await
            .unwrap();

        engine.abort().await;

        assert!(engine.declarations().await.is_empty());
        assert!(engine.was_aborted().await);
    }

    #[tokio::test]
    async fn test_lookups_come_from_config() {
        let engine = MemoryEngine::from_config(&crate::testing::test_config());

        assert_eq!(engine.lookup_availability_zones("us-east-1").await.unwrap().len(), 4);
        assert_eq!(engine.lookup_hosted_zone("dev.example.com.").await.unwrap(), "Z0123456789");
        assert_eq!(engine.engine_type(), "memory");
    }
}
