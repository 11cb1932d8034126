//! Resource dependency graph.
//!
//! The graph owns every resource node of a stack. Edges come from two
//! places: explicit ordering constraints and the deferred [`Output`]
//! references inside a node's properties.

mod builder;
mod dag;
mod node;
mod security;
mod value;

pub use builder::{ResolvedInputs, ResourceGraphBuilder, StackGraph};
pub use dag::ResourceGraph;
pub use node::{ResourceKind, ResourceNode};
pub use security::{rule_properties, RuleDirection, RuleTarget, SecurityRule};
pub use value::{Output, Properties, PropertyValue, ResourceId, TemplatePart, Value, REDACTED};
