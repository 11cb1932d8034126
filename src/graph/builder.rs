//! Construction of the full stack graph.
//!
//! Nodes are created in dependency order: network, routing, security,
//! database tier, instance identity, compute, DNS. Every precondition is
//! checked before the first node is added, so a failed build never leaves
//! a partial graph behind.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::{Secrets, StackConfig};
use crate::error::{PlanError, Result};
use crate::network::{NetworkPlan, SubnetSpec, SubnetTier};

use super::dag::ResourceGraph;
use super::node::ResourceKind;
use super::security::{rule_properties, RuleDirection, RuleTarget, SecurityRule};
use super::value::{Output, Properties, PropertyValue, ResourceId, TemplatePart, Value};

/// Service principal allowed to assume the instance role.
const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";

/// Values resolved outside the graph before construction starts.
#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    /// Identifier of the hosted zone owning the DNS record.
    pub hosted_zone_id: String,
    /// Secrets read from the environment.
    pub secrets: Secrets,
}

/// A validated graph plus the outputs the stack exports.
#[derive(Debug, Clone)]
pub struct StackGraph {
    /// The resource graph.
    pub graph: ResourceGraph,
    /// Named outputs reported after emission.
    pub exports: BTreeMap<String, Output>,
}

/// Builds the resource graph for one stack.
#[derive(Debug)]
pub struct ResourceGraphBuilder<'a> {
    config: &'a StackConfig,
    network: &'a NetworkPlan,
    inputs: &'a ResolvedInputs,
    graph: ResourceGraph,
}

/// Ids of the network layer, needed by later layers.
struct NetworkIds {
    vpc: ResourceId,
    gateway: ResourceId,
    public_subnets: Vec<ResourceId>,
    private_subnets: Vec<ResourceId>,
}

fn props<const N: usize>(entries: [(&str, PropertyValue); N]) -> Properties {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

impl<'a> ResourceGraphBuilder<'a> {
    /// Creates a builder over a network plan.
    #[must_use]
    pub fn new(
        config: &'a StackConfig,
        network: &'a NetworkPlan,
        inputs: &'a ResolvedInputs,
    ) -> Self {
        Self {
            config,
            network,
            inputs,
            graph: ResourceGraph::new(),
        }
    }

    /// Builds and validates the graph.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPrivateSubnets` when the plan has no private
    /// subnet, `MissingPublicSubnet` when it has no public subnet, or a graph
    /// error if the result violates a graph invariant.
    pub fn build(mut self) -> Result<StackGraph> {
        let private = self.network.private_subnets().count();
        if private == 0 {
            return Err(PlanError::InsufficientPrivateSubnets { available: private }.into());
        }
        if self.network.public_subnets().next().is_none() {
            return Err(PlanError::MissingPublicSubnet.into());
        }

        let network = self.add_network()?;
        self.add_routing(&network)?;
        let (app_group, db_group) = self.add_security_groups(network.vpc)?;
        let key_pair = self.add_key_pair(network.vpc)?;
        let database = self.add_database(&network, db_group)?;
        let profile = self.add_instance_identity(network.vpc)?;
        let instance = self.add_instance(&network, app_group, key_pair, profile, database)?;
        let record = self.add_dns_record(instance)?;

        self.graph.validate()?;

        let exports = BTreeMap::from([
            (String::from("vpc_id"), network.vpc.output("id")),
            (String::from("instance_public_ip"), instance.output("public_ip")),
            (String::from("database_address"), database.output("address")),
            (String::from("dns_record"), record.output("fqdn")),
        ]);

        info!(
            "Built resource graph: {} nodes over {} zone(s)",
            self.graph.len(),
            self.network.zone_count()
        );

        Ok(StackGraph {
            graph: self.graph,
            exports,
        })
    }

    /// Name, project and environment tags.
    fn tags(&self, name: &str) -> PropertyValue {
        Value::map([
            ("Name", name),
            ("Project", self.config.project.name.as_str()),
            ("Environment", self.config.project.environment.as_str()),
        ])
    }

    /// VPC, internet gateway, attachment and subnets.
    fn add_network(&mut self) -> Result<NetworkIds> {
        let plan = self.network;
        let vpc_name = plan.vpc_name();
        let vpc = self.graph.add(
            ResourceKind::Vpc,
            vpc_name,
            props([
                ("cidrBlock", Value::from(plan.vpc_cidr())),
                ("tags", self.tags(vpc_name)),
            ]),
            &[],
        )?;

        let gateway_name = plan.gateway_name();
        let gateway = self.graph.add(
            ResourceKind::InternetGateway,
            gateway_name,
            props([("tags", self.tags(gateway_name))]),
            &[vpc],
        )?;

        let attachment = self.graph.add(
            ResourceKind::InternetGatewayAttachment,
            format!("{gateway_name}-attachment"),
            props([
                ("internetGatewayId", Value::from(gateway.output("id"))),
                ("vpcId", Value::from(vpc.output("id"))),
            ]),
            &[],
        )?;

        let mut ids = NetworkIds {
            vpc,
            gateway,
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
        };

        for subnet in plan.subnets() {
            let id = self.add_subnet(subnet, vpc, attachment)?;
            match subnet.tier() {
                SubnetTier::Public => ids.public_subnets.push(id),
                SubnetTier::Private => ids.private_subnets.push(id),
            }
        }

        Ok(ids)
    }

    fn add_subnet(
        &mut self,
        subnet: &SubnetSpec,
        vpc: ResourceId,
        attachment: ResourceId,
    ) -> Result<ResourceId> {
        let name = subnet.name();
        // public subnets are only routable once the gateway is attached
        let explicit: &[ResourceId] = if subnet.is_public() { &[attachment] } else { &[] };

        debug!("Declaring {name} in {}", subnet.availability_zone());
        self.graph.add(
            ResourceKind::Subnet,
            name.as_str(),
            props([
                ("vpcId", Value::from(vpc.output("id"))),
                ("availabilityZone", Value::from(subnet.availability_zone())),
                ("cidrBlock", Value::from(subnet.cidr_block())),
                ("mapPublicIpOnLaunch", Value::from(subnet.is_public())),
                ("tags", self.tags(&name)),
            ]),
            explicit,
        )
    }

    /// Route tables, one association per subnet, and the public default route.
    fn add_routing(&mut self, network: &NetworkIds) -> Result<()> {
        for (tier, subnets) in [
            (SubnetTier::Public, &network.public_subnets),
            (SubnetTier::Private, &network.private_subnets),
        ] {
            let table_name = format!("{tier}-route-table");
            let table = self.graph.add(
                ResourceKind::RouteTable,
                table_name.as_str(),
                props([
                    ("vpcId", Value::from(network.vpc.output("id"))),
                    ("tags", self.tags(&table_name)),
                ]),
                &[],
            )?;

            for (index, subnet) in subnets.iter().enumerate() {
                self.graph.add(
                    ResourceKind::RouteTableAssociation,
                    format!("{tier}-subnet-{index}-association"),
                    props([
                        ("subnetId", Value::from(subnet.output("id"))),
                        ("routeTableId", Value::from(table.output("id"))),
                    ]),
                    &[],
                )?;
            }

            if tier == SubnetTier::Public {
                self.graph.add(
                    ResourceKind::Route,
                    "public-route",
                    props([
                        ("routeTableId", Value::from(table.output("id"))),
                        (
                            "destinationCidrBlock",
                            Value::from(self.config.public_route.destination_cidr),
                        ),
                        ("gatewayId", Value::from(network.gateway.output("id"))),
                    ]),
                    &[],
                )?;
            }
        }

        Ok(())
    }

    /// Application and database security groups.
    fn add_security_groups(&mut self, vpc: ResourceId) -> Result<(ResourceId, ResourceId)> {
        let config = self.config;
        let app = &config.security.app;
        let mut app_rules: Vec<SecurityRule> = app
            .ingress_ports
            .iter()
            .map(|port| {
                SecurityRule::port(
                    RuleDirection::Ingress,
                    app.protocol.as_str(),
                    *port,
                    RuleTarget::Cidr(app.ingress_cidr),
                )
            })
            .collect();
        app_rules.extend(app.egress.iter().map(|rule| {
            SecurityRule::port(
                RuleDirection::Egress,
                rule.protocol.as_str(),
                rule.port,
                RuleTarget::Cidr(rule.cidr),
            )
        }));

        let app_group = self.add_security_group("app-security-group", vpc, &app_rules)?;

        let db = &config.security.database;
        let mut db_rules = vec![SecurityRule::port(
            RuleDirection::Ingress,
            "tcp",
            db.port,
            RuleTarget::SecurityGroup(app_group),
        )];
        db_rules.extend(db.allowed_cidrs.iter().map(|cidr| {
            SecurityRule::port(RuleDirection::Ingress, "tcp", db.port, RuleTarget::Cidr(*cidr))
        }));

        let db_group = self.add_security_group("db-security-group", vpc, &db_rules)?;

        Ok((app_group, db_group))
    }

    fn add_security_group(
        &mut self,
        name: &str,
        vpc: ResourceId,
        rules: &[SecurityRule],
    ) -> Result<ResourceId> {
        let [ingress, egress] = rule_properties(rules);
        self.graph.add(
            ResourceKind::SecurityGroup,
            name,
            props([
                ("vpcId", Value::from(vpc.output("id"))),
                ingress,
                egress,
                ("tags", self.tags(name)),
            ]),
            &[],
        )
    }

    fn add_key_pair(&mut self, vpc: ResourceId) -> Result<ResourceId> {
        let compute = &self.config.compute;
        self.graph.add(
            ResourceKind::KeyPair,
            compute.key_name.as_str(),
            props([
                ("keyName", Value::from(compute.key_name.as_str())),
                ("publicKey", Value::from(compute.ssh_public_key.as_str())),
            ]),
            &[vpc],
        )
    }

    /// Parameter group, subnet group over the private subnets, and the instance.
    fn add_database(&mut self, network: &NetworkIds, db_group: ResourceId) -> Result<ResourceId> {
        let db = &self.config.database;

        let parameter_group = self.graph.add(
            ResourceKind::DbParameterGroup,
            "db-parameter-group",
            props([("family", Value::from(db.parameter_family.as_str()))]),
            &[network.vpc],
        )?;

        let subnet_group = self.graph.add(
            ResourceKind::DbSubnetGroup,
            "db-subnet-group",
            props([(
                "subnetIds",
                Value::list(network.private_subnets.iter().map(|id| id.output("id"))),
            )]),
            &[],
        )?;

        let name = format!("{}-{}", self.config.project.name, db.engine);
        self.graph.add(
            ResourceKind::DbInstance,
            name.as_str(),
            props([
                ("allocatedStorage", Value::from(db.allocated_storage)),
                ("engine", Value::from(db.engine.as_str())),
                ("engineVersion", Value::from(db.engine_version.as_str())),
                ("instanceClass", Value::from(db.instance_class.as_str())),
                ("multiAz", Value::from(db.multi_az)),
                ("parameterGroupName", Value::from(parameter_group.output("name"))),
                ("dbName", Value::from(db.db_name.as_str())),
                ("username", Value::from(db.username.as_str())),
                (
                    "password",
                    Value::Secret(self.inputs.secrets.database_password.clone()),
                ),
                ("dbSubnetGroupName", Value::from(subnet_group.output("name"))),
                ("publiclyAccessible", Value::from(db.publicly_accessible)),
                ("vpcSecurityGroupIds", Value::list([db_group.output("id")])),
                ("skipFinalSnapshot", Value::from(db.skip_final_snapshot)),
                ("tags", self.tags(&name)),
            ]),
            &[],
        )
    }

    /// Role, policy attachments and instance profile.
    fn add_instance_identity(&mut self, vpc: ResourceId) -> Result<ResourceId> {
        let assume_role_policy = serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": EC2_SERVICE_PRINCIPAL },
            }],
        });

        let role = self.graph.add(
            ResourceKind::IamRole,
            "instance-role",
            props([("assumeRolePolicy", Value::from(assume_role_policy.to_string()))]),
            &[vpc],
        )?;

        for arn in &self.config.compute.policy_arns {
            let policy = arn.rsplit('/').next().unwrap_or(arn);
            self.graph.add(
                ResourceKind::IamRolePolicyAttachment,
                format!("{policy}-attachment"),
                props([
                    ("role", Value::from(role.output("name"))),
                    ("policyArn", Value::from(arn)),
                ]),
                &[],
            )?;
        }

        self.graph.add(
            ResourceKind::InstanceProfile,
            "instance-profile",
            props([("role", Value::from(role.output("name")))]),
            &[],
        )
    }

    fn add_instance(
        &mut self,
        network: &NetworkIds,
        app_group: ResourceId,
        key_pair: ResourceId,
        profile: ResourceId,
        database: ResourceId,
    ) -> Result<ResourceId> {
        let compute = &self.config.compute;
        let subnet = network
            .public_subnets
            .first()
            .copied()
            .ok_or(PlanError::MissingPublicSubnet)?;

        self.graph.add(
            ResourceKind::Instance,
            compute.name_tag.as_str(),
            props([
                ("ami", Value::from(compute.ami_id.as_str())),
                ("instanceType", Value::from(compute.instance_type.as_str())),
                ("iamInstanceProfile", Value::from(profile.output("name"))),
                ("vpcSecurityGroupIds", Value::list([app_group.output("id")])),
                ("subnetId", Value::from(subnet.output("id"))),
                ("keyName", Value::from(key_pair.output("keyName"))),
                ("associatePublicIpAddress", Value::from(true)),
                (
                    "rootBlockDevice",
                    Value::map([
                        ("volumeSize", Value::from(compute.root_volume_size)),
                        ("volumeType", Value::from(compute.root_volume_type.as_str())),
                        ("deleteOnTermination", Value::from(true)),
                    ]),
                ),
                ("disableApiTermination", Value::from(false)),
                ("userData", self.user_data(database)),
                ("tags", self.tags(&compute.name_tag)),
            ]),
            &[],
        )
    }

    /// Bootstrap script exporting the database connection settings.
    fn user_data(&self, database: ResourceId) -> PropertyValue {
        let db = &self.config.database;
        let env = |key: &str, value: &str| {
            TemplatePart::text(format!("echo \"{key}={value}\" >> /etc/environment\n"))
        };

        let mut parts = vec![
            TemplatePart::text("#!/bin/bash\necho \"HOST="),
            TemplatePart::Output(database.output("address")),
            TemplatePart::text("\" >> /etc/environment\n"),
            env("USER", &db.username),
            env("DATABASE", &db.db_name),
            TemplatePart::text("echo \"PASSWORD="),
            TemplatePart::Secret(self.inputs.secrets.database_password.clone()),
            TemplatePart::text("\" >> /etc/environment\n"),
            env("DATABASE_PORT", &self.config.security.database.port.to_string()),
            env("DIALECT", &db.engine),
        ];

        parts.extend(
            self.config
                .compute
                .bootstrap_commands
                .iter()
                .map(|command| TemplatePart::text(format!("{command}\n"))),
        );
        parts.push(TemplatePart::text("source /etc/environment\n"));

        Value::Template(parts)
    }

    fn add_dns_record(&mut self, instance: ResourceId) -> Result<ResourceId> {
        let dns = &self.config.dns;
        self.graph.add(
            ResourceKind::DnsRecord,
            dns.record_name(),
            props([
                ("zoneId", Value::from(self.inputs.hosted_zone_id.as_str())),
                ("name", Value::from(dns.record_name())),
                ("type", Value::from("A")),
                ("ttl", Value::from(dns.ttl)),
                ("records", Value::list([instance.output("public_ip")])),
            ]),
            &[],
        )
    }
}
