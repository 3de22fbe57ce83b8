//! Builder pool: the ledger of total, available and assigned builders.
//!
//! The counts live in [`BuilderCounts`] inside the player state while the
//! per-building assignments live on each [`BuildingInstance`]. A
//! [`BuilderPool`] borrows both and keeps them consistent:
//!
//! `sum(assigned_builders) + available == total`
//!
//! Every operation either succeeds completely or leaves both untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingInstance;
use crate::data::Catalog;
use crate::error::ActionError;

/// Builder totals stored in the player state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderCounts {
    /// Builders owned.
    pub total: u32,
    /// Builders not assigned to any building.
    pub available: u32,
    /// Hard cap on `total`.
    pub max_builders: u32,
}

impl Default for BuilderCounts {
    fn default() -> Self {
        Self {
            total: 3,
            available: 3,
            max_builders: 50,
        }
    }
}

impl BuilderCounts {
    /// A pool with `total` idle builders.
    #[must_use]
    pub fn new(total: u32, max_builders: u32) -> Self {
        let total = total.min(max_builders);
        Self {
            total,
            available: total,
            max_builders,
        }
    }
}

/// Result of adding builders to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddBuildersOutcome {
    /// Builders actually added.
    pub added: u32,
    /// Builders dropped because the pool hit `max_builders`.
    pub dropped: u32,
}

/// Mutable view over the builder ledger.
pub struct BuilderPool<'a> {
    counts: &'a mut BuilderCounts,
    buildings: &'a mut BTreeMap<String, BuildingInstance>,
    catalog: &'a Catalog,
}

impl<'a> BuilderPool<'a> {
    /// Borrow the ledger.
    pub fn new(
        counts: &'a mut BuilderCounts,
        buildings: &'a mut BTreeMap<String, BuildingInstance>,
        catalog: &'a Catalog,
    ) -> Self {
        Self {
            counts,
            buildings,
            catalog,
        }
    }

    /// Move one idle builder onto a building.
    pub fn assign(&mut self, building_id: &str) -> Result<(), ActionError> {
        if self.counts.available == 0 {
            return Err(ActionError::NoBuildersAvailable);
        }
        let building = self
            .buildings
            .get_mut(building_id)
            .ok_or_else(|| ActionError::UnknownBuilding(building_id.to_string()))?;
        let definition = self
            .catalog
            .building(&building.type_id)
            .ok_or_else(|| ActionError::UnknownBuilding(building_id.to_string()))?;

        if !building.is_unlocked {
            return Err(ActionError::BuildingLocked(building_id.to_string()));
        }
        if definition.no_workers {
            return Err(ActionError::NoWorkersAllowed(building_id.to_string()));
        }
        if building.assigned_builders >= definition.max_builders {
            return Err(ActionError::BuildingAtCapacity {
                building: building_id.to_string(),
                max: definition.max_builders,
            });
        }

        building.assigned_builders += 1;
        self.counts.available -= 1;
        Ok(())
    }

    /// Return one builder from a building to the idle pool.
    pub fn unassign(&mut self, building_id: &str) -> Result<(), ActionError> {
        let building = self
            .buildings
            .get_mut(building_id)
            .ok_or_else(|| ActionError::UnknownBuilding(building_id.to_string()))?;
        if building.assigned_builders == 0 {
            return Err(ActionError::NoBuildersAssigned(building_id.to_string()));
        }

        building.assigned_builders -= 1;
        self.counts.available += 1;
        Ok(())
    }

    /// Move one builder between buildings, rolling back on failure.
    pub fn reassign(&mut self, from: &str, to: &str) -> Result<(), ActionError> {
        self.unassign(from)?;
        if let Err(err) = self.assign(to) {
            // `unassign` just succeeded, so the builder can go back.
            if let Some(building) = self.buildings.get_mut(from) {
                building.assigned_builders += 1;
                self.counts.available -= 1;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Add idle builders up to `max_builders`.
    pub fn add_builders(&mut self, count: u32) -> AddBuildersOutcome {
        let room = self.counts.max_builders.saturating_sub(self.counts.total);
        let added = count.min(room);
        self.counts.total += added;
        self.counts.available += added;
        AddBuildersOutcome {
            added,
            dropped: count - added,
        }
    }

    /// Send every builder back to the idle pool.
    pub fn reset_all_assignments(&mut self) {
        for building in self.buildings.values_mut() {
            building.assigned_builders = 0;
        }
        self.counts.available = self.counts.total;
    }

    /// Check the ledger invariants.
    #[must_use]
    pub fn validate_consistency(&self) -> bool {
        check_consistency(self.counts, self.buildings, self.catalog)
    }
}

/// Read-only form of [`BuilderPool::validate_consistency`].
#[must_use]
pub fn check_consistency(
    counts: &BuilderCounts,
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
) -> bool {
    let assigned: u64 = buildings
        .values()
        .map(|b| u64::from(b.assigned_builders))
        .sum();
    let within_caps = buildings.values().all(|b| {
        catalog
            .building(&b.type_id)
            .map_or(b.assigned_builders == 0, |def| b.assigned_builders <= def.max_builders)
    });

    within_caps
        && counts.total <= counts.max_builders
        && assigned + u64::from(counts.available) == u64::from(counts.total)
}

/// Rebuild a consistent ledger from possibly stale data.
///
/// Assignments are clamped to per-type caps, then trimmed in id order until
/// they fit the total. Returns the number of builders removed.
pub fn repair_assignments(
    counts: &mut BuilderCounts,
    buildings: &mut BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
) -> u32 {
    counts.total = counts.total.min(counts.max_builders);
    let mut removed = 0;
    let mut remaining = counts.total;

    for building in buildings.values_mut() {
        let cap = catalog
            .building(&building.type_id)
            .filter(|_| building.is_unlocked)
            .map_or(0, |def| def.max_builders);
        let keep = building.assigned_builders.min(cap).min(remaining);
        removed += building.assigned_builders - keep;
        building.assigned_builders = keep;
        remaining -= keep;
    }

    counts.available = remaining;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_state() -> (BuilderCounts, BTreeMap<String, BuildingInstance>, Catalog) {
        let catalog = Catalog::standard();
        let buildings = catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, 30)))
            .collect();
        (BuilderCounts::new(5, 50), buildings, catalog)
    }

    #[test]
    fn test_assign_and_unassign() {
        let (mut counts, mut buildings, catalog) = create_test_state();
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);

        assert!(pool.assign("turret").is_ok());
        assert!(pool.assign("turret").is_ok());
        assert!(pool.validate_consistency());
        assert!(pool.unassign("turret").is_ok());
        assert!(pool.validate_consistency());

        assert_eq!(counts.available, 4);
        assert_eq!(buildings["turret"].assigned_builders, 1);
    }

    #[test]
    fn test_assign_failures() {
        let (mut counts, mut buildings, catalog) = create_test_state();
        if let Some(foundry) = buildings.get_mut("foundry") {
            foundry.is_unlocked = false;
        }
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);

        assert_eq!(
            pool.assign("moon_base"),
            Err(ActionError::UnknownBuilding("moon_base".into()))
        );
        assert_eq!(
            pool.assign("foundry"),
            Err(ActionError::BuildingLocked("foundry".into()))
        );
        assert_eq!(
            pool.assign("chrono_beacon"),
            Err(ActionError::NoWorkersAllowed("chrono_beacon".into()))
        );
        assert_eq!(
            pool.unassign("turret"),
            Err(ActionError::NoBuildersAssigned("turret".into()))
        );
        assert!(pool.validate_consistency());
    }

    #[test]
    fn test_assign_respects_cap_and_pool() {
        let (mut counts, mut buildings, catalog) = create_test_state();
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);
        pool.add_builders(20);

        for _ in 0..8 {
            assert!(pool.assign("targeting_array").is_ok());
        }
        assert!(matches!(
            pool.assign("targeting_array"),
            Err(ActionError::BuildingAtCapacity { max: 8, .. })
        ));

        let mut counts = BuilderCounts::new(1, 50);
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);
        assert!(pool.assign("turret").is_ok());
        assert_eq!(pool.assign("turret"), Err(ActionError::NoBuildersAvailable));
    }

    #[test]
    fn test_reassign_rolls_back() {
        let (mut counts, mut buildings, catalog) = create_test_state();
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);
        pool.assign("turret").expect("assign turret");

        let result = pool.reassign("turret", "chrono_beacon");
        assert!(matches!(result, Err(ActionError::NoWorkersAllowed(_))));
        assert!(pool.validate_consistency());
        assert_eq!(buildings["turret"].assigned_builders, 1);

        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);
        pool.reassign("turret", "scrap_collector").expect("reassign");
        assert_eq!(buildings["turret"].assigned_builders, 0);
        assert_eq!(buildings["scrap_collector"].assigned_builders, 1);
    }

    #[test]
    fn test_add_builders_caps_at_max() {
        let (_, mut buildings, catalog) = create_test_state();
        let mut counts = BuilderCounts::new(48, 50);
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);

        let outcome = pool.add_builders(5);
        assert_eq!(outcome, AddBuildersOutcome { added: 2, dropped: 3 });
        assert_eq!(counts.total, 50);
        assert_eq!(counts.available, 50);
    }

    #[test]
    fn test_reset_all_assignments() {
        let (mut counts, mut buildings, catalog) = create_test_state();
        let mut pool = BuilderPool::new(&mut counts, &mut buildings, &catalog);
        pool.assign("turret").expect("assign");
        pool.assign("scrap_collector").expect("assign");
        pool.reset_all_assignments();

        assert!(pool.validate_consistency());
        assert_eq!(counts.available, counts.total);
    }

    #[test]
    fn test_repair_assignments() {
        let (_, mut buildings, catalog) = create_test_state();
        let mut counts = BuilderCounts {
            total: 4,
            available: 4,
            max_builders: 50,
        };
        if let Some(array) = buildings.get_mut("targeting_array") {
            array.assigned_builders = 12;
        }

        let removed = repair_assignments(&mut counts, &mut buildings, &catalog);
        assert_eq!(removed, 8);
        assert_eq!(counts.available, 0);
        assert!(check_consistency(&counts, &buildings, &catalog));
    }
}
