//! Network address planning.
//!
//! This module turns the region's availability zones into an immutable
//! [`NetworkPlan`]:
//! - zone selection (bounded by the zone cap)
//! - per-tier CIDR derivation
//! - containment and disjointness checks

mod cidr;
mod plan;
mod zones;

pub use cidr::{
    calculate_cidr_block, CidrBlock, CidrPlanner, SubnetTier, DEFAULT_PRIVATE_OFFSET,
    DEFAULT_PUBLIC_OFFSET, MAX_VPC_PREFIX, SUBNET_PREFIX, THIRD_OCTET_LIMIT,
};
pub use plan::{NetworkPlan, SubnetSpec};
pub use zones::{AvailabilityZoneSelector, ZoneSlot, DEFAULT_ZONE_CAP};
