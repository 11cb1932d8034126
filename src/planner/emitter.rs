//! Declaration emitter for handing plans to an engine.
//!
//! The emitter walks the graph in topological order and declares every node
//! exactly once. A failure aborts the engine run; nothing is committed
//! unless every declaration succeeded.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::{HandleOutput, ProvisioningEngine, ResourceDeclaration, ResourceHandle};
use crate::error::{Result, StackError};
use crate::graph::{Output, ResourceId, ResourceNode};

use super::plan::DeploymentPlan;

/// Emitter for deployment plans.
#[derive(Debug)]
pub struct DeclarationEmitter<'a, E: ?Sized> {
    /// Target engine.
    engine: &'a E,
}

/// A declared resource.
#[derive(Debug, Clone, Serialize)]
pub struct EmittedResource {
    /// Handle returned by the engine.
    pub handle: ResourceHandle,
    /// Declaration wave.
    pub wave: usize,
}

/// A stack output after emission.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedOutput {
    /// Reference to the attribute.
    pub output: HandleOutput,
    /// Value, if the engine could resolve it.
    pub value: Option<String>,
}

/// Result of emitting a plan.
#[derive(Debug, Clone, Serialize)]
pub struct EmissionReport {
    /// Id of the emitted plan.
    pub plan_id: Uuid,
    /// Engine type.
    pub engine: &'static str,
    /// Resources in declaration order.
    pub resources: Vec<EmittedResource>,
    /// Number of waves.
    pub waves: usize,
    /// Stack outputs.
    pub exports: BTreeMap<String, ExportedOutput>,
}

impl<'a, E> DeclarationEmitter<'a, E>
where
    E: ProvisioningEngine + ?Sized,
{
    /// Creates a new emitter.
    #[must_use]
    pub const fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Emits a plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is invalid, or the first declaration or
    /// commit error; the engine run is aborted in both cases. Exports are
    /// resolved after commit and a failed resolution leaves the value empty.
    pub async fn emit(&self, plan: &DeploymentPlan) -> Result<EmissionReport> {
        plan.graph.validate()?;

        let order = plan.graph.topological_order()?;
        let wave_of = plan.graph.wave_of()?;
        let waves = wave_of.iter().max().map_or(0, |w| w + 1);

        info!(
            "Emitting {} declarations in {waves} waves to the {} engine",
            order.len(),
            self.engine.engine_type()
        );

        let mut handles: Vec<Option<ResourceHandle>> = vec![None; plan.graph.len()];
        let mut resources = Vec::with_capacity(order.len());

        for id in order {
            let wave = wave_of[id.index()];
            match self.declare(plan, id, wave, &handles).await {
                Ok(handle) => {
                    debug!("Declared {handle} (wave {wave})");
                    resources.push(EmittedResource {
                        handle: handle.clone(),
                        wave,
                    });
                    handles[id.index()] = Some(handle);
                }
                Err(e) => {
                    error!("Declaration failed, aborting run: {e}");
                    self.engine.abort().await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.engine.commit().await {
            error!("Commit failed, aborting run: {e}");
            self.engine.abort().await;
            return Err(e);
        }

        let mut exports = BTreeMap::new();
        for (name, output) in &plan.exports {
            let output = handle_output(&handles, output)?;
            let value = match self.engine.resolve_output(&output).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("Export {name} ({output}) left unresolved: {e}");
                    None
                }
            };
            exports.insert(name.clone(), ExportedOutput { output, value });
        }

        info!("Emitted {} resources", resources.len());

        Ok(EmissionReport {
            plan_id: plan.id,
            engine: self.engine.engine_type(),
            resources,
            waves,
            exports,
        })
    }

    /// Translates one node and declares it.
    async fn declare(
        &self,
        plan: &DeploymentPlan,
        id: ResourceId,
        wave: usize,
        handles: &[Option<ResourceHandle>],
    ) -> Result<ResourceHandle> {
        let node = plan
            .graph
            .node(id)
            .ok_or_else(|| StackError::internal(format!("Resource {id} is not in the plan")))?;

        let declaration = translate(node, wave, handles)?;
        self.engine.declare_resource(declaration).await
    }
}

/// Builds the declaration of a node whose dependencies are all declared.
fn translate(
    node: &ResourceNode,
    wave: usize,
    handles: &[Option<ResourceHandle>],
) -> Result<ResourceDeclaration> {
    let mut properties = BTreeMap::new();
    for (key, value) in node.properties() {
        let declared =
            value.try_map_outputs(&mut |output: &Output| handle_output(handles, output))?;
        properties.insert(key.clone(), declared);
    }

    let depends_on = node
        .depends_on()
        .iter()
        .map(|dep| handle_of(handles, *dep).cloned())
        .collect::<Result<Vec<_>>>()?;

    Ok(ResourceDeclaration {
        kind: node.kind(),
        name: node.name().to_string(),
        properties,
        depends_on,
        wave,
    })
}

fn handle_of(handles: &[Option<ResourceHandle>], id: ResourceId) -> Result<&ResourceHandle> {
    handles
        .get(id.index())
        .and_then(Option::as_ref)
        .ok_or_else(|| StackError::internal(format!("Resource {id} used before it was declared")))
}

fn handle_output(handles: &[Option<ResourceHandle>], output: &Output) -> Result<HandleOutput> {
    handle_of(handles, output.resource).map(|handle| handle.output(output.attribute.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, MockProvisioningEngine};
    use crate::error::EngineError;
    use crate::graph::{ResourceKind, Value};
    use crate::planner::StackPlanner;
    use crate::testing::{test_config, test_secrets};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn plan_with(engine: &MemoryEngine) -> DeploymentPlan {
        StackPlanner::new(&test_config(), &test_secrets())
            .plan(engine)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_node_declared_once_after_dependencies() {
        let engine = MemoryEngine::from_config(&test_config());
        let plan = plan_with(&engine).await;

        let report = DeclarationEmitter::new(&engine).emit(&plan).await.unwrap();
        let declarations = engine.declarations().await;

        assert_eq!(declarations.len(), plan.resource_count());
        assert_eq!(report.resources.len(), plan.resource_count());
        assert!(engine.is_committed().await);

        let mut position = HashMap::new();
        for (i, declaration) in declarations.iter().enumerate() {
            assert!(position.insert(declaration.urn(), i).is_none(), "declared twice");
            for dep in &declaration.depends_on {
                assert!(position[&dep.urn] < i, "{} before {}", declaration.urn(), dep.urn);
                assert!(declarations[position[&dep.urn]].wave < declaration.wave);
            }
        }
        assert_eq!(declarations[0].kind, ResourceKind::Vpc);
        assert_eq!(declarations[0].wave, 0);
    }

    #[tokio::test]
    async fn test_outputs_become_handle_references() {
        let engine = MemoryEngine::from_config(&test_config());
        let plan = plan_with(&engine).await;
        DeclarationEmitter::new(&engine).emit(&plan).await.unwrap();

        let declarations = engine.declarations().await;
        let record = declarations
            .iter()
            .find(|d| d.kind == ResourceKind::DnsRecord)
            .unwrap();

        let instance = ResourceHandle::new(ResourceKind::Instance, "webapp-instance");
        assert_eq!(
            record.properties["records"],
            Value::List(vec![Value::Output(instance.output("public_ip"))])
        );
        assert_eq!(record.depends_on, vec![instance]);
    }

    #[tokio::test]
    async fn test_exports_resolve_through_engine() {
        let instance = ResourceHandle::new(ResourceKind::Instance, "webapp-instance");
        let engine = MemoryEngine::from_config(&test_config())
            .with_output(instance.output("public_ip"), "203.0.113.7");
        let plan = plan_with(&engine).await;

        let report = DeclarationEmitter::new(&engine).emit(&plan).await.unwrap();

        let ip = &report.exports["instance_public_ip"];
        assert_eq!(ip.output, instance.output("public_ip"));
        assert_eq!(ip.value.as_deref(), Some("203.0.113.7"));
        assert_eq!(report.exports["database_address"].value, None);
        assert_eq!(report.engine, "memory");
    }

    #[tokio::test]
    async fn test_failure_aborts_without_commit() {
        let plan = plan_with(&MemoryEngine::from_config(&test_config())).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut engine = MockProvisioningEngine::new();
        engine.expect_engine_type().return_const("mock");
        engine.expect_declare_resource().returning(move |declaration| {
            if counter.fetch_add(1, Ordering::SeqCst) < 4 {
                Ok(declaration.handle())
            } else {
                Err(EngineError::DeclarationFailed {
                    kind: declaration.kind.to_string(),
                    name: declaration.name,
                    message: String::from("quota exceeded"),
                }
                .into())
            }
        });
        engine.expect_abort().times(1).return_const(());
        engine.expect_commit().times(0);

        let err = DeclarationEmitter::new(&engine).emit(&plan).await.unwrap_err();

        assert!(matches!(err, StackError::Engine(EngineError::DeclarationFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_commit_failure_aborts() {
        let plan = plan_with(&MemoryEngine::from_config(&test_config())).await;

        let mut engine = MockProvisioningEngine::new();
        engine.expect_engine_type().return_const("mock");
        engine
            .expect_declare_resource()
            .returning(|declaration| Ok(declaration.handle()));
        engine
            .expect_commit()
            .times(1)
            .returning(|| Err(StackError::internal("disk full")));
        engine.expect_abort().times(1).return_const(());
        engine.expect_resolve_output().times(0);

        assert!(DeclarationEmitter::new(&engine).emit(&plan).await.is_err());
    }

    #[tokio::test]
    async fn test_export_failure_after_commit_keeps_report() {
        let plan = plan_with(&MemoryEngine::from_config(&test_config())).await;

        let mut engine = MockProvisioningEngine::new();
        engine.expect_engine_type().return_const("mock");
        engine
            .expect_declare_resource()
            .returning(|declaration| Ok(declaration.handle()));
        engine.expect_commit().times(1).returning(|| Ok(()));
        engine.expect_abort().times(0);
        engine.expect_resolve_output().returning(|output| {
            if output.attribute == "public_ip" {
                Err(EngineError::lookup("public_ip", "instance not running").into())
            } else {
                Ok(Some(String::from("resolved")))
            }
        });

        let report = DeclarationEmitter::new(&engine).emit(&plan).await.unwrap();

        assert_eq!(report.resources.len(), plan.resource_count());
        assert_eq!(report.exports.len(), plan.exports.len());
        assert_eq!(report.exports["instance_public_ip"].value, None);
        assert_eq!(report.exports["vpc_id"].value.as_deref(), Some("resolved"));
    }
}
