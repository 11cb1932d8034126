//! Availability zone selection.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{PlanError, Result, StackError};

/// Default number of zones that host a subnet pair.
pub const DEFAULT_ZONE_CAP: usize = 3;

/// A selected zone and its position in the truncated zone list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSlot {
    /// Subnet index shared by both tiers in this zone.
    pub index: u32,
    /// Zone identifier (e.g. `us-east-1a`).
    pub zone: String,
}

/// Picks the zones that will host subnet pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityZoneSelector {
    /// Maximum number of zones to use.
    cap: usize,
}

impl AvailabilityZoneSelector {
    /// Creates a selector that keeps at most `cap` zones.
    #[must_use]
    pub const fn new(cap: usize) -> Self {
        Self { cap }
    }

    /// Selects the first `min(available, cap)` zones, in provider order.
    ///
    /// Blank identifiers are ignored. Zones past the cap are never looked at,
    /// so a repeat there does not matter.
    ///
    /// # Errors
    ///
    /// Returns `NoZonesAvailable` if nothing usable remains, or
    /// `DependencyResolutionFailure` if the provider listed a zone twice.
    pub fn select(&self, region: &str, zones: &[String]) -> Result<Vec<ZoneSlot>> {
        let selected: Vec<&str> = zones
            .iter()
            .map(|zone| zone.trim())
            .filter(|zone| !zone.is_empty())
            .take(self.cap)
            .collect();

        if selected.is_empty() {
            return Err(PlanError::NoZonesAvailable {
                region: region.to_string(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(selected.len());
        if let Some(duplicate) = selected.iter().find(|zone| !seen.insert(**zone)) {
            return Err(PlanError::unresolved(
                "availability zones",
                format!("zone '{duplicate}' was listed more than once for {region}"),
            )
            .into());
        }

        let slots = selected
            .into_iter()
            .enumerate()
            .map(|(position, zone)| {
                let index = u32::try_from(position).map_err(|_| {
                    StackError::internal(format!("zone position {position} out of range"))
                })?;
                Ok(ZoneSlot {
                    index,
                    zone: zone.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Selected {} of {} zones in {region}", slots.len(), zones.len());

        Ok(slots)
    }
}

impl Default for AvailabilityZoneSelector {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_caps_at_three() {
        let selector = AvailabilityZoneSelector::default();
        let slots = selector
            .select("us-east-1", &zones(&["az-a", "az-b", "az-c", "az-d"]))
            .unwrap();

        assert_eq!(slots.len(), 3);
        assert_eq!(
            slots[0],
            ZoneSlot {
                index: 0,
                zone: String::from("az-a"),
            }
        );
        assert_eq!(
            slots[2],
            ZoneSlot {
                index: 2,
                zone: String::from("az-c"),
            }
        );
    }

    #[test]
    fn test_count_is_min_of_available_and_cap() {
        let selector = AvailabilityZoneSelector::default();
        let all = zones(&["a", "b", "c", "d", "e"]);
        for k in 1..=all.len() {
            let slots = selector.select("r", &all[..k]).unwrap();
            assert_eq!(slots.len(), k.min(DEFAULT_ZONE_CAP));
        }
    }

    #[test]
    fn test_single_zone_is_valid() {
        let slots = AvailabilityZoneSelector::default()
            .select("us-east-1", &zones(&["az-a"]))
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].index, 0);
    }

    #[test]
    fn test_empty_list_fails() {
        let err = AvailabilityZoneSelector::default()
            .select("us-east-1", &[])
            .unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::NoZonesAvailable { .. })));
    }

    #[test]
    fn test_blank_zones_are_ignored() {
        let err = AvailabilityZoneSelector::default()
            .select("us-east-1", &zones(&["", "  "]))
            .unwrap_err();
        assert!(matches!(err, StackError::Plan(PlanError::NoZonesAvailable { .. })));
    }

    #[test]
    fn test_duplicate_zone_fails() {
        let err = AvailabilityZoneSelector::default()
            .select("us-east-1", &zones(&["az-a", "az-a"]))
            .unwrap_err();
        assert!(matches!(
            err,
            StackError::Plan(PlanError::DependencyResolutionFailure { .. })
        ));
    }

    #[test]
    fn test_duplicate_past_cap_is_ignored() {
        let slots = AvailabilityZoneSelector::default()
            .select("r", &zones(&["a", "b", "c", "d", "d"]))
            .unwrap();

        let selected: Vec<&str> = slots.iter().map(|slot| slot.zone.as_str()).collect();
        assert_eq!(selected, vec!["a", "b", "c"]);

        let err = AvailabilityZoneSelector::default()
            .select("r", &zones(&["a", "b", "a", "c"]))
            .unwrap_err();
        assert!(matches!(
            err,
            StackError::Plan(PlanError::DependencyResolutionFailure { .. })
        ));
    }

    #[test]
    fn test_custom_cap() {
        let slots = AvailabilityZoneSelector::new(1)
            .select("r", &zones(&["a", "b"]))
            .unwrap();
        assert_eq!(slots.len(), 1);
    }
}
