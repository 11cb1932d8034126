//! Values exchanged with a provisioning engine.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::graph::{ResourceKind, Value};

/// Handle to a resource declared in one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceHandle {
    /// Identifier unique within the run, `<kind>::<name>`.
    pub urn: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Logical name.
    pub name: String,
}

/// Deferred attribute of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleOutput {
    /// URN of the resource.
    pub urn: String,
    /// Attribute name.
    pub attribute: String,
}

/// Property value whose references point at declared resources.
pub type DeclaredValue = Value<HandleOutput>;

/// Everything an engine needs to materialize one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDeclaration {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Logical name.
    pub name: String,
    /// Provider properties.
    pub properties: BTreeMap<String, DeclaredValue>,
    /// Resources that must exist first.
    pub depends_on: Vec<ResourceHandle>,
    /// Dependency depth; declarations of one wave are independent.
    pub wave: usize,
}

impl ResourceHandle {
    /// Creates the handle for a kind and name.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            urn: urn(kind, &name),
            kind,
            name,
        }
    }

    /// References an attribute of this resource.
    #[must_use]
    pub fn output(&self, attribute: impl Into<String>) -> HandleOutput {
        HandleOutput {
            urn: self.urn.clone(),
            attribute: attribute.into(),
        }
    }
}

impl ResourceDeclaration {
    /// Returns the URN the declaration will be known under.
    #[must_use]
    pub fn urn(&self) -> String {
        urn(self.kind, &self.name)
    }

    /// Returns the handle the declaration will produce.
    #[must_use]
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle::new(self.kind, self.name.clone())
    }
}

/// Builds a URN.
#[must_use]
pub fn urn(kind: ResourceKind, name: &str) -> String {
    format!("{kind}::{name}")
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urn)
    }
}

impl fmt::Display for HandleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.urn, self.attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_urn_and_output() {
        let handle = ResourceHandle::new(ResourceKind::Instance, "web");
        assert_eq!(handle.urn, "instance::web");
        assert_eq!(handle.output("public_ip").to_string(), "instance::web.public_ip");
    }
}
