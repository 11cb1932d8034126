//! Planning module for stack provisioning.
//!
//! This module turns a configuration into an immutable deployment plan and
//! hands that plan, in dependency order, to a provisioning engine.

mod emitter;
mod plan;
mod stack;

pub use emitter::{DeclarationEmitter, EmissionReport, EmittedResource, ExportedOutput};
pub use plan::{DeploymentPlan, PlanSummary};
pub use stack::StackPlanner;
