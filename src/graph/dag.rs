//! The resource dependency graph (DAG).
//!
//! Nodes are appended in creation order and may only depend on nodes that
//! already exist, so a graph built through [`ResourceGraph::add`] is acyclic
//! by construction. [`ResourceGraph::validate`] still checks every invariant
//! before a graph is handed to an engine.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt::Write as _;
use tracing::debug;

use crate::error::{GraphError, Result};

use super::node::{ResourceKind, ResourceNode};
use super::value::{Properties, ResourceId};

/// Directed acyclic graph of resources rooted at the VPC.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    #[serde(skip)]
    names: HashMap<(ResourceKind, String), ResourceId>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node.
    ///
    /// Its dependencies are the explicit ones plus every resource referenced
    /// by an output inside `properties`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownResource` if a dependency is not in the graph yet, or
    /// `DuplicateName` if the kind already has a node with this name.
    pub fn add(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        properties: Properties,
        explicit: &[ResourceId],
    ) -> Result<ResourceId> {
        let name = name.into();

        let mut depends_on: BTreeSet<ResourceId> = explicit.iter().copied().collect();
        depends_on.extend(
            properties
                .values()
                .flat_map(|value| value.outputs())
                .map(|output| output.resource),
        );

        if let Some(unknown) = depends_on.iter().find(|dep| dep.index() >= self.nodes.len()) {
            return Err(GraphError::UnknownResource {
                id: unknown.index(),
                from: name,
            }
            .into());
        }

        let key = (kind, name);
        if self.names.contains_key(&key) {
            return Err(GraphError::DuplicateName {
                kind: kind.to_string(),
                name: key.1,
            }
            .into());
        }

        let id = ResourceId::new(self.nodes.len());
        debug!("Node {id} {kind} '{}' depends on {} node(s)", key.1, depends_on.len());

        self.nodes.push(ResourceNode {
            id,
            kind,
            name: key.1.clone(),
            properties,
            depends_on,
        });
        self.names.insert(key, id);

        Ok(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all nodes in creation order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: ResourceId) -> Option<&ResourceNode> {
        self.nodes.get(id.index())
    }

    /// Finds a node by kind and name.
    #[must_use]
    pub fn find(&self, kind: ResourceKind, name: &str) -> Option<&ResourceNode> {
        self.names
            .get(&(kind, name.to_string()))
            .and_then(|id| self.node(*id))
    }

    /// Returns every node of one kind, in creation order.
    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    /// Returns the nodes without dependencies.
    pub fn roots(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(|node| node.depends_on.is_empty())
    }

    /// Returns the nodes that directly depend on `id`.
    #[must_use]
    pub fn dependents(&self, id: ResourceId) -> Vec<ResourceId> {
        self.nodes
            .iter()
            .filter(|node| node.depends_on.contains(&id))
            .map(|node| node.id)
            .collect()
    }

    /// Orders the nodes so that each comes after all of its dependencies.
    ///
    /// Ties are broken by creation order, so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` naming the nodes that could not be ordered.
    pub fn topological_order(&self) -> Result<Vec<ResourceId>> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.depends_on.len()).collect();
        let mut dependents: Vec<Vec<ResourceId>> = vec![Vec::new(); self.nodes.len()];

        for node in &self.nodes {
            for dep in &node.depends_on {
                if let Some(list) = dependents.get_mut(dep.index()) {
                    list.push(node.id);
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<ResourceId>> = self
            .roots()
            .map(|node| Reverse(node.id))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for dependent in &dependents[id.index()] {
                let degree = &mut in_degree[dependent.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*dependent));
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            let nodes = self
                .nodes
                .iter()
                .filter(|node| in_degree[node.id.index()] > 0)
                .map(|node| node.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(GraphError::CycleDetected { nodes }.into())
        }
    }

    /// Groups the nodes into waves: a node sits one wave after its deepest
    /// dependency, so nodes of one wave never depend on each other.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if the graph cannot be ordered.
    pub fn waves(&self) -> Result<Vec<Vec<ResourceId>>> {
        let order = self.topological_order()?;
        let mut level = vec![0usize; self.nodes.len()];
        let mut waves: Vec<Vec<ResourceId>> = Vec::new();

        for id in order {
            let depth = self.nodes[id.index()]
                .depends_on
                .iter()
                .map(|dep| level[dep.index()] + 1)
                .max()
                .unwrap_or(0);
            level[id.index()] = depth;

            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(id);
        }

        for wave in &mut waves {
            wave.sort_unstable();
        }

        Ok(waves)
    }

    /// Returns the wave of every node, indexed by id.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if the graph cannot be ordered.
    pub fn wave_of(&self) -> Result<Vec<usize>> {
        let mut by_id = vec![0usize; self.nodes.len()];
        for (wave, ids) in self.waves()?.iter().enumerate() {
            for id in ids {
                by_id[id.index()] = wave;
            }
        }
        Ok(by_id)
    }

    /// Checks the graph invariants: exactly one root which is the VPC, no
    /// cycles, and a dependency path from every node to the root.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        let roots: Vec<&ResourceNode> = self.roots().collect();

        let root = match roots.as_slice() {
            [root] if root.kind == ResourceKind::Vpc => *root,
            [other] => {
                return Err(GraphError::InvalidRoot {
                    message: format!("root is {} '{}', expected a vpc", other.kind, other.name),
                }
                .into());
            }
            [] => {
                return Err(GraphError::InvalidRoot {
                    message: String::from("graph has no root"),
                }
                .into());
            }
            many => {
                let names = many.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(", ");
                return Err(GraphError::InvalidRoot {
                    message: format!("expected a single root, found: {names}"),
                }
                .into());
            }
        };

        let order = self.topological_order()?;

        let mut reaches_root = vec![false; self.nodes.len()];
        for id in order {
            let node = &self.nodes[id.index()];
            reaches_root[id.index()] = node.id == root.id
                || node.depends_on.iter().any(|dep| reaches_root[dep.index()]);
        }

        if let Some(node) = self.nodes.iter().find(|n| !reaches_root[n.id.index()]) {
            return Err(GraphError::Unreachable {
                name: node.name.clone(),
            }
            .into());
        }

        debug!("Graph valid: {} nodes rooted at '{}'", self.nodes.len(), root.name);
        Ok(())
    }

    /// Renders the graph in Graphviz dot syntax, edges pointing at dependencies.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph stack {\n    rankdir=BT;\n");

        for node in &self.nodes {
            let _ = writeln!(
                dot,
                "    n{} [label=\"{}\\n{}\"];",
                node.id.index(),
                node.kind,
                node.name
            );
        }

        for node in &self.nodes {
            for dep in &node.depends_on {
                let _ = writeln!(dot, "    n{} -> n{};", node.id.index(), dep.index());
            }
        }

        dot.push_str("}\n");
        dot
    }
}
