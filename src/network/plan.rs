//! Immutable network plan built from the selected zones.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PlanError, Result};

use super::cidr::{CidrBlock, CidrPlanner, SubnetTier};
use super::zones::ZoneSlot;

/// Address plan for one subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetSpec {
    tier: SubnetTier,
    availability_zone: String,
    cidr_block: CidrBlock,
    index: u32,
}

/// The complete address plan for the VPC.
///
/// All subnet blocks are pairwise disjoint and contained in `vpc_cidr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkPlan {
    vpc_name: String,
    vpc_cidr: CidrBlock,
    gateway_name: String,
    subnets: Vec<SubnetSpec>,
}

impl SubnetSpec {
    /// Derives the subnet for a zone slot and tier.
    ///
    /// # Errors
    ///
    /// Returns `AddressSpaceExhausted` if the tier range is used up.
    pub fn derive(planner: &CidrPlanner, slot: &ZoneSlot, tier: SubnetTier) -> Result<Self> {
        let cidr_block = planner.calculate_cidr_block(slot.index, tier)?;
        Ok(Self {
            tier,
            availability_zone: slot.zone.clone(),
            cidr_block,
            index: slot.index,
        })
    }

    /// Returns the subnet tier.
    #[must_use]
    pub const fn tier(&self) -> SubnetTier {
        self.tier
    }

    /// Returns the availability zone hosting the subnet.
    #[must_use]
    pub fn availability_zone(&self) -> &str {
        &self.availability_zone
    }

    /// Returns the subnet block.
    #[must_use]
    pub const fn cidr_block(&self) -> CidrBlock {
        self.cidr_block
    }

    /// Returns the index within the tier.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Returns the resource name, e.g. `public-subnet-0`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}-subnet-{}", self.tier, self.index)
    }

    /// Returns true for public subnets.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.tier == SubnetTier::Public
    }
}

impl NetworkPlan {
    /// Builds the plan: one public and one private subnet per zone slot.
    ///
    /// # Errors
    ///
    /// Returns an error if a block cannot be derived, leaves the VPC, or
    /// overlaps another block.
    pub fn build(
        vpc_name: impl Into<String>,
        vpc_cidr: CidrBlock,
        gateway_name: impl Into<String>,
        planner: &CidrPlanner,
        slots: &[ZoneSlot],
    ) -> Result<Self> {
        let subnets = slots
            .iter()
            .flat_map(|slot| SubnetTier::ALL.into_iter().map(move |tier| (slot, tier)))
            .map(|(slot, tier)| SubnetSpec::derive(planner, slot, tier))
            .collect::<Result<Vec<_>>>()?;

        Self::check_layout(&vpc_cidr, &subnets)?;

        for subnet in &subnets {
            debug!(
                "Planned {} in {} as {}",
                subnet.name(),
                subnet.availability_zone,
                subnet.cidr_block
            );
        }

        let plan = Self {
            vpc_name: vpc_name.into(),
            vpc_cidr,
            gateway_name: gateway_name.into(),
            subnets,
        };

        info!(
            "Network plan: {} zones, {} public and {} private subnets in {}",
            plan.zone_count(),
            plan.public_subnets().count(),
            plan.private_subnets().count(),
            plan.vpc_cidr
        );

        Ok(plan)
    }

    /// Checks containment and disjointness of the planned blocks.
    fn check_layout(vpc: &CidrBlock, subnets: &[SubnetSpec]) -> Result<()> {
        for (i, subnet) in subnets.iter().enumerate() {
            if !vpc.contains(&subnet.cidr_block) {
                return Err(PlanError::SubnetOutsideVpc {
                    cidr: subnet.cidr_block.to_string(),
                    vpc: vpc.to_string(),
                }
                .into());
            }

            if let Some(other) = subnets[i + 1..]
                .iter()
                .find(|other| other.cidr_block.overlaps(&subnet.cidr_block))
            {
                return Err(PlanError::OverlappingSubnets {
                    first: subnet.cidr_block.to_string(),
                    second: other.cidr_block.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Returns the VPC name.
    #[must_use]
    pub fn vpc_name(&self) -> &str {
        &self.vpc_name
    }

    /// Returns the VPC block.
    #[must_use]
    pub const fn vpc_cidr(&self) -> CidrBlock {
        self.vpc_cidr
    }

    /// Returns the internet gateway name.
    #[must_use]
    pub fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    /// Returns every subnet in zone order, public before private within a zone.
    #[must_use]
    pub fn subnets(&self) -> &[SubnetSpec] {
        &self.subnets
    }

    /// Returns the public subnets in index order.
    pub fn public_subnets(&self) -> impl Iterator<Item = &SubnetSpec> {
        self.subnets.iter().filter(|s| s.tier == SubnetTier::Public)
    }

    /// Returns the private subnets in index order.
    pub fn private_subnets(&self) -> impl Iterator<Item = &SubnetSpec> {
        self.subnets.iter().filter(|s| s.tier == SubnetTier::Private)
    }

    /// Returns the number of zones hosting a subnet pair.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.public_subnets().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::network::AvailabilityZoneSelector;

    fn plan_for(zones: &[&str]) -> Result<NetworkPlan> {
        let zones: Vec<String> = zones.iter().map(|s| (*s).to_string()).collect();
        let slots = AvailabilityZoneSelector::default().select("us-east-1", &zones)?;
        NetworkPlan::build(
            "main",
            "10.0.0.0/16".parse().unwrap(),
            "main-igw",
            &CidrPlanner::default(),
            &slots,
        )
    }

    fn blocks(subnets: impl Iterator<Item = SubnetSpec>) -> Vec<String> {
        subnets.map(|s| s.cidr_block().to_string()).collect()
    }

    #[test]
    fn test_four_zones_yield_three_pairs() {
        let plan = plan_for(&["az-a", "az-b", "az-c", "az-d"]).unwrap();

        assert_eq!(plan.subnets().len(), 6);
        assert_eq!(
            blocks(plan.public_subnets().cloned()),
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]
        );
        assert_eq!(
            blocks(plan.private_subnets().cloned()),
            vec!["10.0.10.0/24", "10.0.11.0/24", "10.0.12.0/24"]
        );

        let indices: Vec<u32> = plan.public_subnets().map(SubnetSpec::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let zones: Vec<&str> = plan.private_subnets().map(SubnetSpec::availability_zone).collect();
        assert_eq!(zones, vec!["az-a", "az-b", "az-c"]);
    }

    #[test]
    fn test_single_zone() {
        let plan = plan_for(&["az-a"]).unwrap();
        assert_eq!(plan.zone_count(), 1);
        assert_eq!(plan.private_subnets().count(), 1);
        assert_eq!(plan.subnets()[0].name(), "public-subnet-0");
        assert_eq!(plan.subnets()[1].name(), "private-subnet-0");
    }

    #[test]
    fn test_no_zones() {
        let err = plan_for(&[]).unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::NoZonesAvailable { .. })));
    }

    #[test]
    fn test_blocks_disjoint_and_contained() {
        let plan = plan_for(&["a", "b", "c"]).unwrap();
        for (i, a) in plan.subnets().iter().enumerate() {
            assert!(plan.vpc_cidr().contains(&a.cidr_block()));
            for b in &plan.subnets()[i + 1..] {
                assert!(!a.cidr_block().overlaps(&b.cidr_block()));
            }
        }
    }

    #[test]
    fn test_colliding_offsets_are_rejected() {
        let slots: Vec<ZoneSlot> = (0..3)
            .map(|index| ZoneSlot {
                index,
                zone: format!("az-{index}"),
            })
            .collect();
        let planner = CidrPlanner::new([10, 0], 0, 1);

        let err = NetworkPlan::build(
            "main",
            "10.0.0.0/16".parse().unwrap(),
            "igw",
            &planner,
            &slots,
        )
        .unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::OverlappingSubnets { .. })));
    }

    #[test]
    fn test_block_outside_vpc_is_rejected() {
        let slots = vec![ZoneSlot {
            index: 0,
            zone: String::from("az-a"),
        }];
        let planner = CidrPlanner::new([10, 1], 0, 10);

        let err = NetworkPlan::build(
            "main",
            "10.0.0.0/16".parse().unwrap(),
            "igw",
            &planner,
            &slots,
        )
        .unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::SubnetOutsideVpc { .. })));
    }
}
