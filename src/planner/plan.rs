//! Deployment plan types.
//!
//! A plan is built once per run, never mutated, and discarded after it has
//! been handed to an engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::Result;
use crate::graph::{Output, ResourceGraph, ResourceId, ResourceKind, StackGraph};
use crate::network::NetworkPlan;

/// A complete, validated deployment plan.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    /// Unique plan id.
    pub id: Uuid,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Qualified stack name.
    pub stack: String,
    /// Target region.
    pub region: String,
    /// Configuration hash this plan is based on.
    pub config_hash: String,
    /// Subnet layout.
    pub network: NetworkPlan,
    /// Resource graph.
    pub graph: ResourceGraph,
    /// Outputs reported after emission.
    pub exports: BTreeMap<String, Output>,
}

/// Condensed view of a plan for display.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    /// Plan id.
    pub id: Uuid,
    /// Qualified stack name.
    pub stack: String,
    /// Number of zones hosting a subnet pair.
    pub zones: usize,
    /// Number of subnets.
    pub subnets: usize,
    /// Number of resources.
    pub resources: usize,
    /// Number of declaration waves.
    pub waves: usize,
    /// Resource count per kind.
    pub by_kind: BTreeMap<ResourceKind, usize>,
}

impl DeploymentPlan {
    /// Freezes a network plan and its graph into a deployment plan.
    #[must_use]
    pub fn new(
        stack: impl Into<String>,
        region: impl Into<String>,
        config_hash: impl Into<String>,
        network: NetworkPlan,
        stack_graph: StackGraph,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            stack: stack.into(),
            region: region.into(),
            config_hash: config_hash.into(),
            network,
            graph: stack_graph.graph,
            exports: stack_graph.exports,
        }
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.graph.len()
    }

    /// Returns the declaration waves.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be ordered.
    pub fn waves(&self) -> Result<Vec<Vec<ResourceId>>> {
        self.graph.waves()
    }

    /// Summarizes the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be ordered.
    pub fn summary(&self) -> Result<PlanSummary> {
        let mut by_kind = BTreeMap::new();
        for node in self.graph.nodes() {
            *by_kind.entry(node.kind()).or_insert(0) += 1;
        }

        Ok(PlanSummary {
            id: self.id,
            stack: self.stack.clone(),
            zones: self.network.zone_count(),
            subnets: self.network.subnets().len(),
            resources: self.graph.len(),
            waves: self.waves()?.len(),
            by_kind,
        })
    }
}
