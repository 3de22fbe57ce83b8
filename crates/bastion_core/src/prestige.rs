//! Prestige: blueprints, permanent upgrades, resets and builder purchases.
//!
//! Prestige only runs on explicit player action, never from the tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingInstance;
use crate::config::{BalanceConfig, BuilderConfig, PrestigeConfig};
use crate::data::{Catalog, PrestigeUpgradeDefinition, Stacking, UpgradeEffectKind};
use crate::error::ActionError;
use crate::math::to_amount;
use crate::state::PlayerState;

/// All owned prestige upgrades folded into one record.
///
/// Multiplier fields are neutral at 1, additive fields at 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrestigeBonuses {
    /// Production multiplier.
    pub production: f64,
    /// Tap damage multiplier.
    pub tap_power: f64,
    /// Auto damage multiplier.
    pub auto_damage: f64,
    /// Wave reward multiplier.
    pub scrap_gain: f64,
    /// Blueprint gain multiplier.
    pub blueprint_gain: f64,
    /// Burst damage multiplier.
    pub burst_damage: f64,
    /// Added burst chance.
    pub burst_chance: f64,
    /// Added offline efficiency.
    pub offline_efficiency: f64,
    /// Scrap granted after each reset.
    pub starting_scrap: f64,
}

impl Default for PrestigeBonuses {
    fn default() -> Self {
        Self {
            production: 1.0,
            tap_power: 1.0,
            auto_damage: 1.0,
            scrap_gain: 1.0,
            blueprint_gain: 1.0,
            burst_damage: 1.0,
            burst_chance: 0.0,
            offline_efficiency: 0.0,
            starting_scrap: 0.0,
        }
    }
}

impl PrestigeBonuses {
    fn slot(&mut self, kind: UpgradeEffectKind) -> &mut f64 {
        match kind {
            UpgradeEffectKind::ProductionMultiplier => &mut self.production,
            UpgradeEffectKind::TapPower => &mut self.tap_power,
            UpgradeEffectKind::AutoDamage => &mut self.auto_damage,
            UpgradeEffectKind::ScrapGain => &mut self.scrap_gain,
            UpgradeEffectKind::BlueprintGain => &mut self.blueprint_gain,
            UpgradeEffectKind::BurstDamage => &mut self.burst_damage,
            UpgradeEffectKind::BurstChance => &mut self.burst_chance,
            UpgradeEffectKind::OfflineEfficiency => &mut self.offline_efficiency,
            UpgradeEffectKind::StartingScrap => &mut self.starting_scrap,
        }
    }

    /// Fold one effect value in according to its stacking rule.
    pub fn apply(&mut self, kind: UpgradeEffectKind, value: f64) {
        let slot = self.slot(kind);
        match kind.stacking() {
            Stacking::Multiplicative => *slot *= value,
            Stacking::Additive => *slot += value,
        }
    }
}

/// A completed upgrade purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePurchase {
    /// Upgrade id.
    pub upgrade: String,
    /// Level after the purchase.
    pub level: u32,
    /// Blueprints spent.
    pub cost: u64,
}

/// Result of a prestige reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrestigeOutcome {
    /// Wave the reset was triggered from.
    pub from_wave: u32,
    /// Blueprints awarded.
    pub blueprints_earned: u64,
    /// Prestige count after the reset.
    pub prestige_count: u32,
    /// Scrap the new run starts with.
    pub starting_scrap: u64,
}

// ============================================================================
// Blueprints
// ============================================================================

/// Blueprints for prestiging at `wave`: 0 below the threshold, otherwise
/// `floor(base * (wave / min_wave)^exp)`.
#[must_use]
pub fn calculate_blueprints_earned(wave: u32, config: &PrestigeConfig) -> u64 {
    if !can_prestige(wave, config) {
        return 0;
    }
    let ratio = f64::from(wave) / f64::from(config.min_prestige_wave);
    to_amount(config.blueprint_base * ratio.powf(config.blueprint_exponent))
}

/// Check whether `wave` is high enough to prestige.
#[must_use]
pub fn can_prestige(wave: u32, config: &PrestigeConfig) -> bool {
    config.min_prestige_wave > 0 && wave >= config.min_prestige_wave
}

// ============================================================================
// Upgrades
// ============================================================================

/// Blueprint cost of buying the next level: `floor(base * mult^level)`.
#[must_use]
pub fn upgrade_cost(definition: &PrestigeUpgradeDefinition, current_level: u32) -> u64 {
    to_amount(definition.base_cost as f64 * definition.cost_multiplier.powi(current_level as i32))
}

/// Effect value at `level`; neutral at level 0.
#[must_use]
pub fn upgrade_effect(definition: &PrestigeUpgradeDefinition, level: u32) -> f64 {
    if level == 0 {
        definition.effect.neutral()
    } else {
        definition.base_effect + definition.per_level * f64::from(level)
    }
}

/// Fold owned upgrades into one bonus record; unknown ids are ignored.
#[must_use]
pub fn calculate_bonuses(owned: &BTreeMap<String, u32>, catalog: &Catalog) -> PrestigeBonuses {
    let mut bonuses = PrestigeBonuses::default();
    for (id, &level) in owned {
        let Some(definition) = catalog.upgrade(id) else {
            continue;
        };
        if level == 0 {
            continue;
        }
        bonuses.apply(definition.effect, upgrade_effect(definition, level.min(definition.max_level)));
    }
    bonuses
}

/// Buy one level of a prestige upgrade. Fails without side effects.
pub fn purchase_upgrade(
    player: &mut PlayerState,
    catalog: &Catalog,
    upgrade_id: &str,
) -> Result<UpgradePurchase, ActionError> {
    let definition = catalog
        .upgrade(upgrade_id)
        .ok_or_else(|| ActionError::UnknownUpgrade(upgrade_id.to_string()))?;
    let level = player.prestige_upgrades.get(upgrade_id).copied().unwrap_or(0);
    if level >= definition.max_level {
        return Err(ActionError::UpgradeMaxed {
            upgrade: upgrade_id.to_string(),
            max_level: definition.max_level,
        });
    }
    let cost = upgrade_cost(definition, level);
    if player.blueprints < cost {
        return Err(ActionError::InsufficientBlueprints {
            required: cost,
            available: player.blueprints,
        });
    }

    player.blueprints -= cost;
    player.prestige_upgrades.insert(upgrade_id.to_string(), level + 1);
    Ok(UpgradePurchase {
        upgrade: upgrade_id.to_string(),
        level: level + 1,
        cost,
    })
}

// ============================================================================
// Builders
// ============================================================================

/// Blueprint price of the next builder given how many were bought.
#[must_use]
pub fn builder_purchase_cost(builders_purchased: u32, config: &BuilderConfig) -> u64 {
    config
        .purchase_tiers
        .iter()
        .filter(|tier| tier.from_purchased <= builders_purchased)
        .max_by_key(|tier| tier.from_purchased)
        .map_or(0, |tier| tier.cost)
}

/// Buy one builder with blueprints; returns the price paid.
pub fn purchase_builder(player: &mut PlayerState, config: &BuilderConfig) -> Result<u64, ActionError> {
    let max = player.builders.max_builders;
    if player.builders.total >= max {
        return Err(ActionError::BuilderLimitReached(max));
    }
    let cost = builder_purchase_cost(player.builders_purchased, config);
    if player.blueprints < cost {
        return Err(ActionError::InsufficientBlueprints {
            required: cost,
            available: player.blueprints,
        });
    }

    player.blueprints -= cost;
    player.builders.total += 1;
    player.builders.available += 1;
    player.builders_purchased += 1;
    Ok(cost)
}

// ============================================================================
// Reset
// ============================================================================

/// Convert the current run into blueprints and start over at wave 1.
///
/// Keeps blueprints, upgrade levels, builder totals and the highest wave.
/// Combat is left to the caller, which spawns the first enemy afterwards.
pub fn execute_prestige(
    player: &mut PlayerState,
    buildings: &mut BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
) -> Result<PrestigeOutcome, ActionError> {
    let wave = player.current_wave;
    if !can_prestige(wave, &config.prestige) {
        return Err(ActionError::PrestigeLocked {
            required: config.prestige.min_prestige_wave,
            current: wave,
        });
    }

    let bonuses = calculate_bonuses(&player.prestige_upgrades, catalog);
    let earned = to_amount(calculate_blueprints_earned(wave, &config.prestige) as f64 * bonuses.blueprint_gain);
    let starting_scrap = config
        .prestige
        .base_starting_scrap
        .saturating_add(to_amount(bonuses.starting_scrap));

    player.blueprints = player.blueprints.saturating_add(earned);
    player.total_blueprints_earned = player.total_blueprints_earned.saturating_add(earned);
    player.prestige_count += 1;
    player.highest_wave = player.highest_wave.max(wave);
    player.current_wave = 1;
    player.scrap = starting_scrap;
    player.active_boosts.clear();
    player.builders.available = player.builders.total;

    for building in buildings.values_mut() {
        if let Some(definition) = catalog.building(&building.type_id) {
            building.reset_to_base(definition, 1);
        } else {
            building.assigned_builders = 0;
        }
    }

    Ok(PrestigeOutcome {
        from_wave: wave,
        blueprints_earned: earned,
        prestige_count: player.prestige_count,
        starting_scrap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosts::{BoostInstance, BoostScope};

    fn create_test_player() -> PlayerState {
        PlayerState::new(&BalanceConfig::default())
    }

    #[test]
    fn test_blueprints_threshold_and_growth() {
        let config = PrestigeConfig::default();
        assert_eq!(calculate_blueprints_earned(0, &config), 0);
        assert_eq!(calculate_blueprints_earned(19, &config), 0);
        assert_eq!(calculate_blueprints_earned(20, &config), 10);
        assert_eq!(calculate_blueprints_earned(40, &config), 40);

        let mut last = 0;
        for wave in 20..500 {
            let earned = calculate_blueprints_earned(wave, &config);
            assert!(earned > last, "blueprints did not grow at wave {wave}");
            last = earned;
        }
    }

    #[test]
    fn test_upgrade_cost_and_effect_curves() {
        let catalog = Catalog::standard();
        let upgrade = catalog.upgrade("reinforced_tools").expect("upgrade");
        assert_eq!(upgrade_cost(upgrade, 0), 5);
        assert_eq!(upgrade_cost(upgrade, 1), 7);
        assert_eq!(upgrade_effect(upgrade, 0), 1.0);
        assert!((upgrade_effect(upgrade, 3) - 1.3).abs() < 1e-12);

        let chance = catalog.upgrade("hair_trigger").expect("upgrade");
        assert_eq!(upgrade_effect(chance, 0), 0.0);
        assert!((upgrade_effect(chance, 2) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_bonuses_stacks_by_kind() {
        let catalog = Catalog::standard();
        let owned: BTreeMap<String, u32> = [
            ("reinforced_tools".to_string(), 2),
            ("hair_trigger".to_string(), 3),
            ("standing_reserve".to_string(), 2),
            ("retired_upgrade".to_string(), 9),
        ]
        .into_iter()
        .collect();

        let bonuses = calculate_bonuses(&owned, &catalog);
        assert!((bonuses.production - 1.2).abs() < 1e-12);
        assert!((bonuses.burst_chance - 0.06).abs() < 1e-12);
        assert_eq!(bonuses.starting_scrap, 1_000.0);
        assert_eq!(bonuses.tap_power, 1.0);
    }

    #[test]
    fn test_purchase_upgrade_is_atomic() {
        let catalog = Catalog::standard();
        let mut player = create_test_player();
        player.blueprints = 4;

        let before = player.clone();
        let result = purchase_upgrade(&mut player, &catalog, "reinforced_tools");
        assert_eq!(
            result,
            Err(ActionError::InsufficientBlueprints {
                required: 5,
                available: 4
            })
        );
        assert_eq!(player, before);

        player.blueprints = 12;
        let purchase = purchase_upgrade(&mut player, &catalog, "reinforced_tools").expect("purchase");
        assert_eq!(purchase.level, 1);
        assert_eq!(player.blueprints, 7);

        assert!(matches!(
            purchase_upgrade(&mut player, &catalog, "nope"),
            Err(ActionError::UnknownUpgrade(_))
        ));
    }

    #[test]
    fn test_purchase_upgrade_maxed() {
        let catalog = Catalog::standard();
        let mut player = create_test_player();
        player.blueprints = 1_000_000;
        player.prestige_upgrades.insert("night_shift".into(), 8);
        assert!(matches!(
            purchase_upgrade(&mut player, &catalog, "night_shift"),
            Err(ActionError::UpgradeMaxed { max_level: 8, .. })
        ));
        assert_eq!(player.blueprints, 1_000_000);
    }

    #[test]
    fn test_builder_cost_tiers() {
        let config = BuilderConfig::default();
        assert_eq!(builder_purchase_cost(0, &config), 5);
        assert_eq!(builder_purchase_cost(4, &config), 5);
        assert_eq!(builder_purchase_cost(5, &config), 10);
        assert_eq!(builder_purchase_cost(19, &config), 25);
        assert_eq!(builder_purchase_cost(20, &config), 50);
        assert_eq!(builder_purchase_cost(45, &config), 50);
    }

    #[test]
    fn test_purchase_builder() {
        let config = BalanceConfig::default();
        let mut player = create_test_player();
        player.blueprints = 5;
        assert_eq!(purchase_builder(&mut player, &config.builders), Ok(5));
        assert_eq!(player.builders.total, 4);
        assert_eq!(player.builders.available, 4);
        assert_eq!(player.builders_purchased, 1);

        player.blueprints = 1_000;
        player.builders.total = player.builders.max_builders;
        assert_eq!(
            purchase_builder(&mut player, &config.builders),
            Err(ActionError::BuilderLimitReached(50))
        );
    }

    #[test]
    fn test_prestige_reset() {
        let catalog = Catalog::standard();
        let config = BalanceConfig::default();
        let mut player = create_test_player();
        let mut buildings: BTreeMap<_, _> = catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, 30)))
            .collect();

        player.current_wave = 30;
        player.highest_wave = 30;
        player.scrap = 99_999;
        player.blueprints = 3;
        player.prestige_upgrades.insert("standing_reserve".into(), 1);
        player.active_boosts.push(BoostInstance {
            id: "boost-1".into(),
            remaining_duration_ms: 5_000,
            multiplier: 2.0,
            scope: BoostScope::All,
        });
        if let Some(turret) = buildings.get_mut("turret") {
            turret.level = 9;
            turret.assigned_builders = 2;
            player.builders.available -= 2;
        }

        let outcome = execute_prestige(&mut player, &mut buildings, &catalog, &config).expect("prestige");

        assert_eq!(outcome.blueprints_earned, 22);
        assert_eq!(player.blueprints, 25);
        assert_eq!(player.prestige_upgrades["standing_reserve"], 1);
        assert_eq!(player.prestige_count, 1);
        assert_eq!(player.current_wave, 1);
        assert_eq!(player.highest_wave, 30);
        assert_eq!(player.scrap, 500);
        assert!(player.active_boosts.is_empty());
        assert_eq!(player.builders.available, player.builders.total);
        assert!(buildings.values().all(|b| b.level == 1 && b.evolution_tier == 1));
        assert!(!buildings["foundry"].is_unlocked);
    }

    #[test]
    fn test_prestige_locked_below_threshold() {
        let catalog = Catalog::standard();
        let config = BalanceConfig::default();
        let mut player = create_test_player();
        player.current_wave = 12;
        let mut buildings = BTreeMap::new();

        assert_eq!(
            execute_prestige(&mut player, &mut buildings, &catalog, &config),
            Err(ActionError::PrestigeLocked {
                required: 20,
                current: 12
            })
        );
    }
}
