//! Resource kinds and graph nodes.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::value::{Output, Properties, PropertyValue, ResourceId};

/// Every kind of resource the stack declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Virtual private cloud.
    Vpc,
    /// Internet gateway.
    InternetGateway,
    /// Attachment of the gateway to the VPC.
    InternetGatewayAttachment,
    /// Subnet.
    Subnet,
    /// Route table.
    RouteTable,
    /// Association of a subnet with a route table.
    RouteTableAssociation,
    /// Route inside a route table.
    Route,
    /// Security group.
    SecurityGroup,
    /// SSH key pair.
    KeyPair,
    /// Database parameter group.
    DbParameterGroup,
    /// Database subnet group.
    DbSubnetGroup,
    /// Managed database instance.
    DbInstance,
    /// IAM role.
    IamRole,
    /// Managed policy attached to a role.
    IamRolePolicyAttachment,
    /// Instance profile wrapping a role.
    InstanceProfile,
    /// Compute instance.
    Instance,
    /// DNS record.
    DnsRecord,
}

impl ResourceKind {
    /// Provider type token understood by the execution engine.
    #[must_use]
    pub const fn type_token(self) -> &'static str {
        match self {
            Self::Vpc => "aws:ec2/vpc:Vpc",
            Self::InternetGateway => "aws:ec2/internetGateway:InternetGateway",
            Self::InternetGatewayAttachment => {
                "aws:ec2/internetGatewayAttachment:InternetGatewayAttachment"
            }
            Self::Subnet => "aws:ec2/subnet:Subnet",
            Self::RouteTable => "aws:ec2/routeTable:RouteTable",
            Self::RouteTableAssociation => "aws:ec2/routeTableAssociation:RouteTableAssociation",
            Self::Route => "aws:ec2/route:Route",
            Self::SecurityGroup => "aws:ec2/securityGroup:SecurityGroup",
            Self::KeyPair => "aws:ec2/keyPair:KeyPair",
            Self::DbParameterGroup => "aws:rds/parameterGroup:ParameterGroup",
            Self::DbSubnetGroup => "aws:rds/subnetGroup:SubnetGroup",
            Self::DbInstance => "aws:rds/instance:Instance",
            Self::IamRole => "aws:iam/role:Role",
            Self::IamRolePolicyAttachment => "aws:iam/rolePolicyAttachment:RolePolicyAttachment",
            Self::InstanceProfile => "aws:iam/instanceProfile:InstanceProfile",
            Self::Instance => "aws:ec2/instance:Instance",
            Self::DnsRecord => "aws:route53/record:Record",
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::InternetGateway => "internet_gateway",
            Self::InternetGatewayAttachment => "internet_gateway_attachment",
            Self::Subnet => "subnet",
            Self::RouteTable => "route_table",
            Self::RouteTableAssociation => "route_table_association",
            Self::Route => "route",
            Self::SecurityGroup => "security_group",
            Self::KeyPair => "key_pair",
            Self::DbParameterGroup => "db_parameter_group",
            Self::DbSubnetGroup => "db_subnet_group",
            Self::DbInstance => "db_instance",
            Self::IamRole => "iam_role",
            Self::IamRolePolicyAttachment => "iam_role_policy_attachment",
            Self::InstanceProfile => "instance_profile",
            Self::Instance => "instance",
            Self::DnsRecord => "dns_record",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource owned by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    pub(super) id: ResourceId,
    pub(super) kind: ResourceKind,
    pub(super) name: String,
    pub(super) properties: Properties,
    pub(super) depends_on: BTreeSet<ResourceId>,
}

impl ResourceNode {
    /// Returns the node id.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the logical name, unique per kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared properties.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns a single property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Returns every node this one must wait for.
    #[must_use]
    pub const fn depends_on(&self) -> &BTreeSet<ResourceId> {
        &self.depends_on
    }

    /// Returns true if this node waits for `other`.
    #[must_use]
    pub fn depends_on_id(&self, other: ResourceId) -> bool {
        self.depends_on.contains(&other)
    }

    /// References an attribute of this node.
    #[must_use]
    pub fn output(&self, attribute: impl Into<String>) -> Output {
        self.id.output(attribute)
    }
}
