//! Scrap production.
//!
//! Each unlocked production building outputs
//!
//! ```text
//! base_production(tier) * level_multiplier * effective_workers
//!     * wave_bonus * prestige * boost * synergy * command_center_bonus
//! ```
//!
//! per second. Output accumulates in the building's `production_progress`;
//! whole units are paid out each tick and the fraction carries over.

use std::collections::BTreeMap;

use crate::buildings::{level_multiplier, BuildingInstance};
use crate::config::{BalanceConfig, ProductionConfig};
use crate::data::{BuildingRole, Catalog, EvolvableBuildingDefinition};
use crate::efficiency::effective_workers;
use crate::math::{split_whole, to_amount};

/// Global multipliers shared by every production building this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionModifiers {
    /// Current wave, for the wave bonus.
    pub wave: u32,
    /// Prestige production multiplier.
    pub prestige: f64,
    /// Combined production boost.
    pub boost: f64,
    /// `1 + sum` of active production synergies.
    pub synergy_production: f64,
    /// `1 + sum` of active efficiency synergies.
    pub synergy_efficiency: f64,
}

impl Default for ProductionModifiers {
    fn default() -> Self {
        Self {
            wave: 0,
            prestige: 1.0,
            boost: 1.0,
            synergy_production: 1.0,
            synergy_efficiency: 1.0,
        }
    }
}

/// Scrap paid out by one production step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionTick {
    /// Total whole scrap produced.
    pub produced: u64,
    /// Whole scrap by building id, only buildings that paid out.
    pub per_building: Vec<(String, u64)>,
}

/// Result of an offline batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineProduction {
    /// Seconds actually credited after the cap.
    pub seconds_credited: f64,
    /// Efficiency factor applied.
    pub efficiency: f64,
    /// Scrap earned.
    pub scrap: u64,
}

/// `1 + log10(wave + 1) * factor`.
#[must_use]
pub fn wave_bonus(wave: u32, config: &ProductionConfig) -> f64 {
    1.0 + (f64::from(wave) + 1.0).log10() * config.wave_bonus_factor
}

/// Raw output of a building: `base * level_multiplier * effective_workers`.
///
/// Returns 0 for locked buildings or a missing tier. No global modifiers.
#[must_use]
pub fn building_output(
    definition: &EvolvableBuildingDefinition,
    instance: &BuildingInstance,
    config: &BalanceConfig,
    efficiency_multiplier: f64,
) -> f64 {
    if !instance.is_unlocked {
        return 0.0;
    }
    let Some(tier) = instance.current_tier(definition) else {
        return 0.0;
    };
    let workers = effective_workers(instance.assigned_builders, &config.efficiency);
    tier.base_production
        * level_multiplier(instance.level, config.production.level_bonus)
        * workers
        * efficiency_multiplier
}

/// `1 + output(command_center)`; neutral when the building is absent.
#[must_use]
pub fn command_center_bonus(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    efficiency_multiplier: f64,
) -> f64 {
    let id = config.production.command_center_id.as_str();
    let output = buildings
        .get(id)
        .zip(catalog.building(id))
        .map_or(0.0, |(instance, definition)| {
            building_output(definition, instance, config, efficiency_multiplier)
        });
    1.0 + output
}

/// Per-second scrap output of every production building, by id.
///
/// Buildings with no output are included with 0 so the UI can list them.
#[must_use]
pub fn production_rates(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    modifiers: &ProductionModifiers,
) -> BTreeMap<String, f64> {
    let global = wave_bonus(modifiers.wave, &config.production)
        * modifiers.prestige
        * modifiers.boost
        * modifiers.synergy_production
        * command_center_bonus(buildings, catalog, config, modifiers.synergy_efficiency);

    buildings
        .iter()
        .filter_map(|(id, instance)| {
            let definition = catalog.building(&instance.type_id)?;
            if definition.role != BuildingRole::Production {
                return None;
            }
            let rate = building_output(definition, instance, config, modifiers.synergy_efficiency) * global;
            Some((id.clone(), rate))
        })
        .collect()
}

/// Sum of [`production_rates`].
#[must_use]
pub fn total_production_per_second(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    modifiers: &ProductionModifiers,
) -> f64 {
    production_rates(buildings, catalog, config, modifiers)
        .values()
        .sum()
}

/// Pure accumulator step: returns `(whole_units, new_progress)`.
#[must_use]
pub fn accumulate(progress: f64, rate_per_second: f64, delta_ms: i64) -> (u64, f64) {
    if delta_ms <= 0 || rate_per_second <= 0.0 {
        return (0, progress);
    }
    split_whole(progress + rate_per_second * delta_ms as f64 / 1000.0)
}

/// Advance every production building by `delta_ms`.
pub fn tick_production(
    buildings: &mut BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    modifiers: &ProductionModifiers,
    delta_ms: i64,
) -> ProductionTick {
    let mut result = ProductionTick::default();
    if delta_ms <= 0 {
        return result;
    }

    let rates = production_rates(buildings, catalog, config, modifiers);
    for (id, rate) in rates {
        let Some(instance) = buildings.get_mut(&id) else {
            continue;
        };
        let (whole, progress) = accumulate(instance.production_progress, rate, delta_ms);
        instance.production_progress = progress;
        if whole > 0 {
            result.produced = result.produced.saturating_add(whole);
            result.per_building.push((id, whole));
        }
    }
    result
}

/// Single-batch offline estimate.
///
/// `bonus_efficiency` is the prestige offline bonus added to the base
/// factor; the total is capped at 1.
#[must_use]
pub fn calculate_offline_production(
    per_second: f64,
    elapsed_seconds: f64,
    config: &ProductionConfig,
    bonus_efficiency: f64,
) -> OfflineProduction {
    let seconds_credited = elapsed_seconds.clamp(0.0, config.max_offline_seconds.max(0.0));
    let efficiency = (config.offline_efficiency + bonus_efficiency).clamp(0.0, 1.0);
    OfflineProduction {
        seconds_credited,
        efficiency,
        scrap: to_amount(per_second * seconds_credited * efficiency),
    }
}
