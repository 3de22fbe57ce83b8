//! Building-gated special effects.
//!
//! Each [`SpecialEffectKind`] is owned by one building type and is inert
//! unless that building is unlocked and its *current* tier carries the
//! effect. Strength scales with level, assigned workers and a per-tier
//! multiplier table.

use std::collections::BTreeMap;

use rand::Rng;

use crate::buildings::BuildingInstance;
use crate::config::{BalanceConfig, SpecialEffectsConfig, WaveConfig};
use crate::data::{Catalog, SpecialEffectKind};
use crate::math::{clamp_chance, tier_lookup, to_amount};

/// A building currently providing an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSource<'a> {
    /// Building id.
    pub building: &'a str,
    /// Building level.
    pub level: u32,
    /// Assigned builders.
    pub workers: u32,
    /// Current evolution tier.
    pub tier: u32,
}

/// Scrap found by one building during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapFind {
    /// Building that found the scrap.
    pub building: String,
    /// Cooldowns completed.
    pub triggers: u64,
    /// Scrap found over all triggers.
    pub amount: u64,
}

/// Every building whose current tier provides `kind`.
#[must_use]
pub fn effect_sources<'a>(
    buildings: &'a BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    kind: SpecialEffectKind,
) -> Vec<EffectSource<'a>> {
    buildings
        .iter()
        .filter(|(_, b)| b.is_unlocked)
        .filter(|(_, b)| {
            catalog
                .building(&b.type_id)
                .and_then(|def| def.special_effect_at(b.evolution_tier))
                == Some(kind)
        })
        .map(|(id, b)| EffectSource {
            building: id.as_str(),
            level: b.level,
            workers: b.assigned_builders,
            tier: b.evolution_tier,
        })
        .collect()
}

/// Check whether any building currently provides `kind`.
#[must_use]
pub fn is_effect_active(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    kind: SpecialEffectKind,
) -> bool {
    !effect_sources(buildings, catalog, kind).is_empty()
}

// ============================================================================
// Scrap find
// ============================================================================

/// Seconds between scrap finds.
#[must_use]
pub fn scrap_find_cooldown(level: u32, workers: u32, config: &SpecialEffectsConfig) -> f64 {
    let cfg = &config.scrap_find;
    (cfg.base_cooldown
        - f64::from(level) * cfg.cooldown_per_level
        - f64::from(workers) * cfg.cooldown_per_worker)
        .max(cfg.min_cooldown)
}

/// Scrap found per trigger.
#[must_use]
pub fn scrap_find_reward(wave_reward: f64, tier: u32, prestige_scrap: f64, config: &SpecialEffectsConfig) -> f64 {
    wave_reward * config.scrap_find.reward_percent * tier_lookup(&config.tier_multipliers, tier) * prestige_scrap
}

/// Advance scrap-find cooldowns and collect triggers.
///
/// A delta spanning many cooldowns yields one [`ScrapFind`] per building
/// carrying every trigger, so the cost does not grow with the delta.
///
/// Timers of buildings without the effect are reset so an effect gained
/// later starts from a full cooldown.
pub fn tick_scrap_find(
    buildings: &mut BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &SpecialEffectsConfig,
    wave_reward: f64,
    prestige_scrap: f64,
    delta_seconds: f64,
) -> Vec<ScrapFind> {
    let mut finds = Vec::new();
    if delta_seconds <= 0.0 {
        return finds;
    }

    for (id, building) in buildings.iter_mut() {
        let active = building.is_unlocked
            && catalog
                .building(&building.type_id)
                .and_then(|def| def.special_effect_at(building.evolution_tier))
                == Some(SpecialEffectKind::ScrapFind);
        if !active {
            building.effect_timer = 0.0;
            continue;
        }

        let cooldown = scrap_find_cooldown(building.level, building.assigned_builders, config);
        building.effect_timer += delta_seconds;
        if cooldown <= 0.0 || building.effect_timer < cooldown {
            continue;
        }
        let triggers = to_amount(building.effect_timer / cooldown);
        building.effect_timer = building.effect_timer.rem_euclid(cooldown);
        let per_trigger = to_amount(scrap_find_reward(
            wave_reward,
            building.evolution_tier,
            prestige_scrap,
            config,
        ));
        let amount = per_trigger.saturating_mul(triggers);
        if amount > 0 {
            finds.push(ScrapFind {
                building: id.clone(),
                triggers,
                amount,
            });
        }
    }
    finds
}

// ============================================================================
// Burst boost
// ============================================================================

/// Burst chance added by every burst-boost building, summed and capped.
#[must_use]
pub fn burst_boost_bonus(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &SpecialEffectsConfig,
) -> f64 {
    let cfg = &config.burst_boost;
    let total: f64 = effect_sources(buildings, catalog, SpecialEffectKind::BurstBoost)
        .iter()
        .map(|s| {
            (cfg.base + f64::from(s.level) * cfg.per_level + f64::from(s.workers) * cfg.per_worker)
                * tier_lookup(&config.tier_multipliers, s.tier)
        })
        .sum();
    total.min(cfg.cap)
}

// ============================================================================
// Critical weakness
// ============================================================================

/// Chance that a weak-point hit becomes critical; 0 when inert.
#[must_use]
pub fn critical_weakness_chance(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &SpecialEffectsConfig,
) -> f64 {
    let cfg = &config.critical_weakness;
    effect_sources(buildings, catalog, SpecialEffectKind::CriticalWeakness)
        .iter()
        .map(|s| {
            (cfg.base + f64::from(s.level) * cfg.per_level + f64::from(s.workers) * cfg.per_worker)
                * tier_lookup(&config.tier_multipliers, s.tier)
        })
        .fold(0.0, f64::max)
        .min(cfg.cap)
}

// ============================================================================
// Wave extend
// ============================================================================

/// Per-wave chance of bonus timer seconds.
#[must_use]
pub fn wave_extend_chance(level: u32, tier: u32, config: &SpecialEffectsConfig) -> f64 {
    let cfg = &config.wave_extend;
    ((cfg.base_chance + f64::from(level) * cfg.chance_per_level) * tier_lookup(&config.tier_multipliers, tier))
        .min(cfg.chance_cap)
}

/// Bonus seconds when wave-extend triggers.
#[must_use]
pub fn wave_extend_seconds(tier: u32, config: &SpecialEffectsConfig, waves: &WaveConfig) -> f64 {
    let cfg = &config.wave_extend;
    waves.base_timer * (cfg.base_percent + f64::from(tier) * cfg.percent_per_tier).min(cfg.percent_cap)
}

/// Roll wave-extend for a new wave; returns bonus seconds (0 when none).
///
/// Draws from `rng` only when a source exists.
pub fn roll_wave_extend<R: Rng + ?Sized>(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    rng: &mut R,
) -> f64 {
    let best = effect_sources(buildings, catalog, SpecialEffectKind::WaveExtend)
        .into_iter()
        .max_by_key(|s| (s.tier, s.level));
    let Some(source) = best else {
        return 0.0;
    };

    let chance = clamp_chance(wave_extend_chance(source.level, source.tier, &config.effects));
    if rng.gen::<f64>() < chance {
        wave_extend_seconds(source.tier, &config.effects, &config.waves)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn buildings_at(catalog: &Catalog, wave: u32) -> BTreeMap<String, BuildingInstance> {
        catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, wave)))
            .collect()
    }

    #[test]
    fn test_effect_inert_until_tier_defines_it() {
        let catalog = Catalog::standard();
        // Drone bay unlocks at wave 8 but only finds scrap from tier 2.
        let early = buildings_at(&catalog, 10);
        assert!(early["salvage_drone_bay"].is_unlocked);
        assert!(!is_effect_active(&early, &catalog, SpecialEffectKind::ScrapFind));

        let later = buildings_at(&catalog, 22);
        assert!(is_effect_active(&later, &catalog, SpecialEffectKind::ScrapFind));
    }

    #[test]
    fn test_scrap_find_cooldown_floor() {
        let config = SpecialEffectsConfig::default();
        assert_eq!(scrap_find_cooldown(0, 0, &config), 30.0);
        assert_eq!(scrap_find_cooldown(4, 2, &config), 26.0);
        assert_eq!(scrap_find_cooldown(100, 100, &config), config.scrap_find.min_cooldown);
    }

    #[test]
    fn test_scrap_find_triggers_on_cooldown() {
        let catalog = Catalog::standard();
        let config = SpecialEffectsConfig::default();
        let mut buildings = buildings_at(&catalog, 22);

        let cooldown = scrap_find_cooldown(1, 0, &config);
        assert!(tick_scrap_find(&mut buildings, &catalog, &config, 1_000.0, 1.0, cooldown - 1.0).is_empty());
        let finds = tick_scrap_find(&mut buildings, &catalog, &config, 1_000.0, 1.0, 1.0);
        assert_eq!(finds.len(), 1);
        assert_eq!(finds[0].building, "salvage_drone_bay");
        // 5% of 1000 at tier 2 (x1.25).
        assert_eq!(finds[0].amount, 62);
        assert_eq!(finds[0].triggers, 1);
    }

    #[test]
    fn test_scrap_find_huge_delta_batches_triggers() {
        let catalog = Catalog::standard();
        let config = SpecialEffectsConfig::default();
        let mut buildings = buildings_at(&catalog, 22);
        let cooldown = scrap_find_cooldown(1, 0, &config);

        let finds = tick_scrap_find(&mut buildings, &catalog, &config, 1_000.0, 1.0, cooldown * 10.5);
        assert_eq!(finds.len(), 1);
        assert_eq!(finds[0].triggers, 10);
        assert_eq!(finds[0].amount, 620);
        assert!((buildings["salvage_drone_bay"].effect_timer - cooldown * 0.5).abs() < 1e-9);

        // A billion seconds resolves in one step per building.
        let finds = tick_scrap_find(&mut buildings, &catalog, &config, 1_000.0, 1.0, 1e9);
        assert_eq!(finds.len(), 1);
        assert!(finds[0].triggers >= 1_000_000_000 / 30);
        assert_eq!(finds[0].amount, 62 * finds[0].triggers);
        assert!(buildings["salvage_drone_bay"].effect_timer < cooldown);
    }

    #[test]
    fn test_burst_boost_sums_and_caps() {
        let catalog = Catalog::standard();
        let config = SpecialEffectsConfig::default();
        let mut buildings = buildings_at(&catalog, 1);
        assert_eq!(burst_boost_bonus(&buildings, &catalog, &config), 0.0);

        buildings = buildings_at(&catalog, 10);
        let bonus = burst_boost_bonus(&buildings, &catalog, &config);
        assert!((bonus - 0.025).abs() < 1e-12);

        if let Some(array) = buildings.get_mut("targeting_array") {
            array.level = 500;
        }
        assert_eq!(burst_boost_bonus(&buildings, &catalog, &config), config.burst_boost.cap);
    }

    #[test]
    fn test_critical_weakness_requires_scanner() {
        let catalog = Catalog::standard();
        let config = SpecialEffectsConfig::default();
        assert_eq!(critical_weakness_chance(&buildings_at(&catalog, 1), &catalog, &config), 0.0);
        let chance = critical_weakness_chance(&buildings_at(&catalog, 15), &catalog, &config);
        assert!((chance - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_wave_extend() {
        let config = BalanceConfig::default();
        let seconds = wave_extend_seconds(1, &config.effects, &config.waves);
        assert!((seconds - 4.5).abs() < 1e-9);
        assert_eq!(wave_extend_seconds(50, &config.effects, &config.waves), 15.0);
        assert!(wave_extend_chance(1_000, 2, &config.effects) <= config.effects.wave_extend.chance_cap);

        let catalog = Catalog::standard();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let none = roll_wave_extend(&buildings_at(&catalog, 1), &catalog, &config, &mut rng);
        assert_eq!(none, 0.0);
    }
}
