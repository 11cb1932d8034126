//! CIDR block value type and per-tier subnet address derivation.
//!
//! Subnets are always `/24` blocks carved from the third octet of the VPC
//! range. Each tier owns a fixed offset into that octet, so public index `i`
//! and private index `i` never land on the same block.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::config::NetworkSettings;
use crate::error::{ConfigError, PlanError, Result};

/// Prefix length of every planned subnet.
pub const SUBNET_PREFIX: u8 = 24;

/// Exclusive upper bound for the derived third octet.
pub const THIRD_OCTET_LIMIT: u32 = 255;

/// Offset of the public tier into the third octet.
pub const DEFAULT_PUBLIC_OFFSET: u32 = 0;

/// Offset of the private tier into the third octet.
pub const DEFAULT_PRIVATE_OFFSET: u32 = 10;

/// Widest VPC prefix the planner can carve `/24` subnets from.
pub const MAX_VPC_PREFIX: u8 = 16;

/// An IPv4 network in CIDR notation.
///
/// Invariants:
/// - prefix length is at most 32
/// - host bits of the network address are zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CidrBlock {
    network: Ipv4Addr,
    prefix: u8,
}

/// Classification of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    /// Internet-routable subnet.
    Public,
    /// Internal-only subnet.
    Private,
}

/// Derives subnet blocks from `(index, tier)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrPlanner {
    /// First two octets shared by every block (from the VPC range).
    leading: [u8; 2],
    /// Third-octet offset of the public tier.
    public_offset: u32,
    /// Third-octet offset of the private tier.
    private_offset: u32,
}

impl CidrBlock {
    /// `0.0.0.0/0`.
    pub const ANY: Self = Self {
        network: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    /// `10.0.0.0/16`, the default VPC range.
    pub const DEFAULT_VPC: Self = Self {
        network: Ipv4Addr::new(10, 0, 0, 0),
        prefix: 16,
    };

    /// Creates a CIDR block, rejecting invalid prefixes and set host bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is greater than 32 or the address has host bits set.
    pub fn new(network: Ipv4Addr, prefix: u8) -> std::result::Result<Self, ConfigError> {
        if prefix > 32 {
            return Err(ConfigError::InvalidCidr {
                value: format!("{network}/{prefix}"),
                reason: String::from("prefix length must be between 0 and 32"),
            });
        }

        let block = Self { network, prefix };
        if u32::from(network) & !block.mask() != 0 {
            return Err(ConfigError::InvalidCidr {
                value: format!("{network}/{prefix}"),
                reason: String::from("host bits must be zero"),
            });
        }

        Ok(block)
    }

    /// Returns the network address.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Returns the netmask as an integer.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    /// Returns true if `other` lies entirely inside this block.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.network) & self.mask() == u32::from(self.network)
    }

    /// Returns true if the two blocks share at least one address.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl FromStr for CidrBlock {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidCidr {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (address, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected ADDRESS/PREFIX"))?;

        let network = address
            .parse::<Ipv4Addr>()
            .map_err(|_| invalid("address is not a valid IPv4 address"))?;

        let prefix = prefix
            .parse::<u8>()
            .map_err(|_| invalid("prefix length is not a number"))?;

        Self::new(network, prefix)
    }
}

impl TryFrom<String> for CidrBlock {
    type Error = ConfigError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CidrBlock> for String {
    fn from(block: CidrBlock) -> Self {
        block.to_string()
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl SubnetTier {
    /// Both tiers, in the order subnets are emitted for a zone.
    pub const ALL: [Self; 2] = [Self::Public, Self::Private];

    /// Returns the lowercase tier label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CidrPlanner {
    /// Creates a planner for the given leading octets and tier offsets.
    #[must_use]
    pub const fn new(leading: [u8; 2], public_offset: u32, private_offset: u32) -> Self {
        Self {
            leading,
            public_offset,
            private_offset,
        }
    }

    /// Creates a planner whose blocks live inside `vpc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the VPC prefix is narrower than `/16`.
    pub fn for_vpc(vpc: &CidrBlock, settings: &NetworkSettings) -> Result<Self> {
        if vpc.prefix() > MAX_VPC_PREFIX {
            return Err(ConfigError::validation(
                format!(
                    "VPC block {vpc} is too narrow, subnets need at least a /{MAX_VPC_PREFIX}"
                ),
                "vpc.cidr",
            )
            .into());
        }

        let [a, b, _, _] = vpc.network().octets();
        Ok(Self::new([a, b], settings.public_offset, settings.private_offset))
    }

    /// Returns the third-octet offset for a tier.
    #[must_use]
    pub const fn offset(&self, tier: SubnetTier) -> u32 {
        match tier {
            SubnetTier::Public => self.public_offset,
            SubnetTier::Private => self.private_offset,
        }
    }

    /// Computes the `/24` block for a subnet index in a tier.
    ///
    /// # Errors
    ///
    /// Returns `AddressSpaceExhausted` when `offset + index >= 255`.
    pub fn calculate_cidr_block(&self, index: u32, tier: SubnetTier) -> Result<CidrBlock> {
        let offset = self.offset(tier);

        let third = offset
            .checked_add(index)
            .filter(|octet| *octet < THIRD_OCTET_LIMIT)
            .and_then(|octet| u8::try_from(octet).ok())
            .ok_or(PlanError::AddressSpaceExhausted {
                tier,
                index,
                offset,
            })?;

        let [a, b] = self.leading;
        Ok(CidrBlock {
            network: Ipv4Addr::new(a, b, third, 0),
            prefix: SUBNET_PREFIX,
        })
    }
}

impl Default for CidrPlanner {
    fn default() -> Self {
        Self::new([10, 0], DEFAULT_PUBLIC_OFFSET, DEFAULT_PRIVATE_OFFSET)
    }
}

/// Computes the block for `(index, tier)` inside the default `10.0.0.0/16` VPC.
///
/// # Errors
///
/// Returns `AddressSpaceExhausted` when `offset + index >= 255`.
pub fn calculate_cidr_block(index: u32, tier: SubnetTier) -> Result<CidrBlock> {
    CidrPlanner::default().calculate_cidr_block(index, tier)
}
