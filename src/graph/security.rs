//! Security group rules.

use serde::Serialize;

use crate::network::CidrBlock;

use super::value::{PropertyValue, ResourceId, Value};

/// Direction of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    /// Inbound traffic.
    Ingress,
    /// Outbound traffic.
    Egress,
}

/// Peer of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RuleTarget {
    /// An address range.
    Cidr(CidrBlock),
    /// Members of another security group. Referencing one adds an edge.
    SecurityGroup(ResourceId),
}

/// One security group rule over a port range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRule {
    /// Direction.
    pub direction: RuleDirection,
    /// Protocol, e.g. `tcp`.
    pub protocol: String,
    /// First port.
    pub from_port: u16,
    /// Last port.
    pub to_port: u16,
    /// Peer.
    pub target: RuleTarget,
}

impl SecurityRule {
    /// Rule opening a single port.
    #[must_use]
    pub fn port(
        direction: RuleDirection,
        protocol: impl Into<String>,
        port: u16,
        target: RuleTarget,
    ) -> Self {
        Self {
            direction,
            protocol: protocol.into(),
            from_port: port,
            to_port: port,
            target,
        }
    }

    /// Renders the rule as a provider property map.
    #[must_use]
    pub fn to_value(&self) -> PropertyValue {
        let peer = match &self.target {
            RuleTarget::Cidr(cidr) => ("cidrBlocks", Value::list([*cidr])),
            RuleTarget::SecurityGroup(group) => {
                ("securityGroups", Value::list([group.output("id")]))
            }
        };

        Value::map([
            ("protocol", Value::from(self.protocol.as_str())),
            ("fromPort", Value::from(self.from_port)),
            ("toPort", Value::from(self.to_port)),
            peer,
        ])
    }
}

/// Splits rules into the `ingress` and `egress` property lists.
#[must_use]
pub fn rule_properties(rules: &[SecurityRule]) -> [(&'static str, PropertyValue); 2] {
    let list = |direction: RuleDirection| {
        Value::List(
            rules
                .iter()
                .filter(|rule| rule.direction == direction)
                .map(SecurityRule::to_value)
                .collect(),
        )
    };

    [
        ("ingress", list(RuleDirection::Ingress)),
        ("egress", list(RuleDirection::Egress)),
    ]
}
