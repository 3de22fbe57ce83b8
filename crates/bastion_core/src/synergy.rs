//! Cross-building synergies.
//!
//! A synergy is active while its worker requirements hold. Active synergies
//! fold into one [`SynergyBonuses`] record: kill-scrap adds up as a
//! percentage, efficiency/production/damage add into `1 + sum`, and
//! upgrade speed multiplies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingInstance;
use crate::data::{Catalog, SynergyDefinition, SynergyEffect, SynergyRule, WorkerRequirement};

/// Combined bonuses of all active synergies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynergyBonuses {
    /// Additive percentage on wave-clear scrap (0 = none).
    pub kill_scrap: f64,
    /// Effective-worker multiplier.
    pub efficiency: f64,
    /// Production multiplier.
    pub production: f64,
    /// Damage multiplier.
    pub damage: f64,
    /// Upgrade speed multiplier.
    pub upgrade_speed: f64,
}

impl Default for SynergyBonuses {
    fn default() -> Self {
        Self {
            kill_scrap: 0.0,
            efficiency: 1.0,
            production: 1.0,
            damage: 1.0,
            upgrade_speed: 1.0,
        }
    }
}

fn requirement_met(requirement: &WorkerRequirement, buildings: &BTreeMap<String, BuildingInstance>) -> bool {
    buildings
        .get(&requirement.building)
        .is_some_and(|b| b.is_unlocked && b.assigned_builders >= requirement.min_workers)
}

/// Check whether a synergy's rule currently holds.
#[must_use]
pub fn is_synergy_active(synergy: &SynergyDefinition, buildings: &BTreeMap<String, BuildingInstance>) -> bool {
    match &synergy.rule {
        SynergyRule::AllOf(requirements) => {
            !requirements.is_empty() && requirements.iter().all(|r| requirement_met(r, buildings))
        }
        SynergyRule::AnchorWithOthers {
            anchor,
            others,
            min_workers,
        } => {
            if !requirement_met(anchor, buildings) {
                return false;
            }
            let qualifying = buildings
                .iter()
                .filter(|(id, b)| {
                    id.as_str() != anchor.building && b.is_unlocked && b.assigned_builders >= *min_workers
                })
                .count();
            qualifying >= *others as usize
        }
    }
}

/// Synergies whose rules currently hold, in catalog order.
#[must_use]
pub fn active_synergies<'a>(
    catalog: &'a Catalog,
    buildings: &BTreeMap<String, BuildingInstance>,
) -> Vec<&'a SynergyDefinition> {
    catalog
        .synergies()
        .iter()
        .filter(|s| is_synergy_active(s, buildings))
        .collect()
}

/// Fold active synergies into one bonus record.
#[must_use]
pub fn calculate_synergy_bonuses(active: &[&SynergyDefinition]) -> SynergyBonuses {
    let mut bonuses = SynergyBonuses::default();
    for synergy in active {
        match synergy.effect {
            SynergyEffect::KillScrap(value) => bonuses.kill_scrap += value,
            SynergyEffect::Efficiency(value) => bonuses.efficiency += value,
            SynergyEffect::Production(value) => bonuses.production += value,
            SynergyEffect::Damage(value) => bonuses.damage += value,
            SynergyEffect::UpgradeSpeed(value) => bonuses.upgrade_speed *= value,
        }
    }
    bonuses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staffed(catalog: &Catalog, wave: u32, staff: &[(&str, u32)]) -> BTreeMap<String, BuildingInstance> {
        let mut buildings: BTreeMap<_, _> = catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, wave)))
            .collect();
        for (id, workers) in staff {
            if let Some(b) = buildings.get_mut(*id) {
                b.assigned_builders = *workers;
            }
        }
        buildings
    }

    fn active_ids(catalog: &Catalog, buildings: &BTreeMap<String, BuildingInstance>) -> Vec<String> {
        active_synergies(catalog, buildings)
            .iter()
            .map(|s| s.id.clone())
            .collect()
    }

    #[test]
    fn test_no_synergies_is_neutral() {
        let catalog = Catalog::standard();
        let buildings = staffed(&catalog, 30, &[]);
        assert!(active_ids(&catalog, &buildings).is_empty());
        assert_eq!(calculate_synergy_bonuses(&[]), SynergyBonuses::default());
    }

    #[test]
    fn test_all_of_requires_every_building() {
        let catalog = Catalog::standard();
        let partial = staffed(&catalog, 30, &[("turret", 3), ("targeting_array", 1)]);
        assert!(!active_ids(&catalog, &partial).contains(&"firing_solution".to_string()));

        let full = staffed(&catalog, 30, &[("turret", 3), ("targeting_array", 2)]);
        assert!(active_ids(&catalog, &full).contains(&"firing_solution".to_string()));
    }

    #[test]
    fn test_locked_building_blocks_synergy() {
        let catalog = Catalog::standard();
        // Foundry unlocks at wave 12.
        let buildings = staffed(&catalog, 5, &[("scrap_collector", 3), ("foundry", 3)]);
        assert!(!active_ids(&catalog, &buildings).contains(&"assembly_line".to_string()));
    }

    #[test]
    fn test_anchor_with_others() {
        let catalog = Catalog::standard();
        let three_others = staffed(
            &catalog,
            30,
            &[("command_center", 5), ("turret", 3), ("scrap_collector", 3), ("salvage_yard", 3)],
        );
        assert!(!active_ids(&catalog, &three_others).contains(&"full_mobilization".to_string()));

        let four_others = staffed(
            &catalog,
            30,
            &[
                ("command_center", 5),
                ("turret", 3),
                ("scrap_collector", 3),
                ("salvage_yard", 3),
                ("foundry", 3),
            ],
        );
        assert!(active_ids(&catalog, &four_others).contains(&"full_mobilization".to_string()));
    }

    #[test]
    fn test_bonus_stacking_rules() {
        let catalog = Catalog::standard();
        let buildings = staffed(
            &catalog,
            30,
            &[
                ("turret", 5),
                ("railgun", 3),
                ("targeting_array", 2),
                ("command_center", 3),
                ("foundry", 2),
            ],
        );
        let active = active_synergies(&catalog, &buildings);
        let bonuses = calculate_synergy_bonuses(&active);

        // firing_solution + crossfire add; logistics_hub multiplies.
        assert!((bonuses.damage - 1.5).abs() < 1e-12);
        assert!((bonuses.upgrade_speed - 1.5).abs() < 1e-12);
        assert_eq!(bonuses.production, 1.0);
        assert_eq!(bonuses.kill_scrap, 0.0);
    }
}
