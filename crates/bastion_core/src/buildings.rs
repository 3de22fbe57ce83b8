//! Building instances, levels, timed upgrades and evolution.
//!
//! A [`BuildingInstance`] is the mutable per-save record of one building
//! type. Its definition lives in the [`Catalog`](crate::data::Catalog) and is
//! looked up by `type_id` whenever a formula needs static stats.

use serde::{Deserialize, Serialize};

use crate::data::{BuildingTier, EvolvableBuildingDefinition};

/// Mutable state of one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingInstance {
    /// Instance id.
    pub id: String,
    /// Catalog id of the building type.
    pub type_id: String,
    /// Current level, at least 1.
    pub level: u32,
    /// Builders currently working here.
    pub assigned_builders: u32,
    /// Current evolution tier, at least 1.
    pub evolution_tier: u32,
    /// Fractional scrap carried between ticks.
    pub production_progress: f64,
    /// Seconds of work done on a running upgrade.
    pub upgrade_progress: Option<f64>,
    /// Whether the building can be used yet.
    pub is_unlocked: bool,
    /// Seconds since the last scrap-find trigger.
    pub effect_timer: f64,
}

impl Default for BuildingInstance {
    fn default() -> Self {
        Self {
            id: String::new(),
            type_id: String::new(),
            level: 1,
            assigned_builders: 0,
            evolution_tier: 1,
            production_progress: 0.0,
            upgrade_progress: None,
            is_unlocked: false,
            effect_timer: 0.0,
        }
    }
}

/// What changed when a building was brought up to date with the wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierChange {
    /// Nothing changed.
    None,
    /// The building became available.
    Unlocked,
    /// The building moved to a higher tier.
    Evolved {
        /// Previous tier.
        from: u32,
        /// New tier.
        to: u32,
    },
}

/// Progress of a timed upgrade after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpgradeStep {
    /// Still running with this many seconds of work done.
    Running(f64),
    /// Finished this step.
    Complete,
}

impl BuildingInstance {
    /// Create a fresh level-1 instance for the given wave.
    #[must_use]
    pub fn new(definition: &EvolvableBuildingDefinition, wave: u32) -> Self {
        let mut instance = Self {
            id: definition.id.clone(),
            type_id: definition.id.clone(),
            ..Self::default()
        };
        instance.reset_to_base(definition, wave);
        instance
    }

    /// Return to level 1 at the base tier, as after a prestige reset.
    ///
    /// Assigned builders are cleared; the caller owns the pool bookkeeping.
    pub fn reset_to_base(&mut self, definition: &EvolvableBuildingDefinition, wave: u32) {
        self.level = 1;
        self.assigned_builders = 0;
        self.production_progress = 0.0;
        self.upgrade_progress = None;
        self.effect_timer = 0.0;
        self.evolution_tier = definition.base_tier().map_or(1, |t| t.tier);
        self.is_unlocked = false;
        self.sync_with_wave(definition, wave);
    }

    /// Unlock or evolve the building for a newly reached wave.
    ///
    /// The tier never moves down.
    pub fn sync_with_wave(&mut self, definition: &EvolvableBuildingDefinition, wave: u32) -> TierChange {
        let Some(target) = definition.tier_for_wave(wave) else {
            return TierChange::None;
        };
        if !self.is_unlocked {
            self.is_unlocked = true;
            self.evolution_tier = self.evolution_tier.max(target);
            return TierChange::Unlocked;
        }
        if target > self.evolution_tier {
            let from = self.evolution_tier;
            self.evolution_tier = target;
            return TierChange::Evolved { from, to: target };
        }
        TierChange::None
    }

    /// The tier data for the current evolution tier.
    #[must_use]
    pub fn current_tier<'a>(&self, definition: &'a EvolvableBuildingDefinition) -> Option<&'a BuildingTier> {
        definition.tier(self.evolution_tier)
    }

    /// Check whether an upgrade is running.
    #[must_use]
    pub fn is_upgrading(&self) -> bool {
        self.upgrade_progress.is_some()
    }

    /// Advance a running upgrade; returns `true` when it completed.
    ///
    /// `speed` scales the work done per second. A completed upgrade raises
    /// the level by one.
    pub fn advance_upgrade(&mut self, delta_seconds: f64, speed: f64, seconds_per_level: f64) -> bool {
        let Some(progress) = self.upgrade_progress else {
            return false;
        };
        let duration = upgrade_duration(self.level, seconds_per_level);
        match step_upgrade(progress, delta_seconds * speed, duration) {
            UpgradeStep::Running(next) => {
                self.upgrade_progress = Some(next);
                false
            }
            UpgradeStep::Complete => {
                self.upgrade_progress = None;
                self.level += 1;
                true
            }
        }
    }
}

/// Upgrade cost at `level`: `floor(base_cost * multiplier^(level - 1))`.
///
/// Level 0 is treated as level 1.
#[must_use]
pub fn calculate_upgrade_cost(base_cost: u64, multiplier: f64, level: u32) -> u64 {
    let exponent = level.max(1) - 1;
    crate::math::to_amount(base_cost as f64 * multiplier.powi(exponent as i32))
}

/// Cost of upgrading `instance` from its current level.
///
/// `None` when the current tier is missing from the definition.
#[must_use]
pub fn upgrade_cost_for(definition: &EvolvableBuildingDefinition, instance: &BuildingInstance) -> Option<u64> {
    instance
        .current_tier(definition)
        .map(|tier| calculate_upgrade_cost(tier.base_cost, definition.cost_multiplier, instance.level))
}

/// Production multiplier of a level: `1 + (level - 1) * level_bonus`.
#[must_use]
pub fn level_multiplier(level: u32, level_bonus: f64) -> f64 {
    1.0 + f64::from(level.max(1) - 1) * level_bonus
}

/// Seconds of work an upgrade from `level` needs.
#[must_use]
pub fn upgrade_duration(level: u32, seconds_per_level: f64) -> f64 {
    (seconds_per_level * f64::from(level)).max(0.0)
}

/// Pure step of an upgrade timer.
#[must_use]
pub fn step_upgrade(progress: f64, work: f64, duration: f64) -> UpgradeStep {
    let next = progress + work.max(0.0);
    if next >= duration {
        UpgradeStep::Complete
    } else {
        UpgradeStep::Running(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BuildingRole, SpecialEffectKind};

    fn create_test_definition() -> EvolvableBuildingDefinition {
        let tier = |tier: u32, unlock_wave: u32| BuildingTier {
            tier,
            name: format!("Turret Mk{tier}"),
            base_production: 10.0,
            base_cost: 100,
            unlock_wave,
            special_effect: (tier == 3).then_some(SpecialEffectKind::BurstBoost),
        };
        EvolvableBuildingDefinition {
            id: "turret".to_string(),
            name: "Turret".to_string(),
            role: BuildingRole::Combat,
            cost_multiplier: 1.5,
            max_builders: 10,
            tiers: vec![tier(1, 1), tier(2, 10), tier(3, 30)],
            no_workers: false,
            aliases: Vec::new(),
        }
    }

    #[test]
    fn test_upgrade_cost_scenario() {
        assert_eq!(calculate_upgrade_cost(100, 1.5, 1), 100);
        assert_eq!(calculate_upgrade_cost(100, 1.5, 2), 150);
        assert_eq!(calculate_upgrade_cost(100, 1.5, 3), 225);
        assert_eq!(calculate_upgrade_cost(100, 1.5, 0), 100);
    }

    #[test]
    fn test_upgrade_cost_strictly_increasing() {
        let mut last = 0;
        for level in 1..80 {
            let cost = calculate_upgrade_cost(10, 1.5, level);
            assert!(cost > last, "cost did not grow at level {level}");
            last = cost;
        }
    }

    #[test]
    fn test_level_multiplier() {
        assert_eq!(level_multiplier(1, 0.1), 1.0);
        assert!((level_multiplier(11, 0.1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_instance_unlocks_by_wave() {
        let def = create_test_definition();
        let fresh = BuildingInstance::new(&def, 1);
        assert!(fresh.is_unlocked);
        assert_eq!(fresh.evolution_tier, 1);

        let late = BuildingInstance::new(&def, 40);
        assert_eq!(late.evolution_tier, 3);
    }

    #[test]
    fn test_sync_only_moves_up() {
        let def = create_test_definition();
        let mut instance = BuildingInstance::new(&def, 1);

        assert_eq!(instance.sync_with_wave(&def, 5), TierChange::None);
        assert_eq!(
            instance.sync_with_wave(&def, 10),
            TierChange::Evolved { from: 1, to: 2 }
        );
        assert_eq!(instance.sync_with_wave(&def, 3), TierChange::None);
        assert_eq!(instance.evolution_tier, 2);
    }

    #[test]
    fn test_reset_to_base() {
        let def = create_test_definition();
        let mut instance = BuildingInstance::new(&def, 40);
        instance.level = 7;
        instance.assigned_builders = 4;
        instance.upgrade_progress = Some(2.0);

        instance.reset_to_base(&def, 1);
        assert_eq!(instance.level, 1);
        assert_eq!(instance.assigned_builders, 0);
        assert_eq!(instance.evolution_tier, 1);
        assert!(!instance.is_upgrading());
    }

    #[test]
    fn test_timed_upgrade_completes() {
        let def = create_test_definition();
        let mut instance = BuildingInstance::new(&def, 1);
        instance.level = 2;
        instance.upgrade_progress = Some(0.0);

        // Level 2 at 1s per level needs 2s of work.
        assert!(!instance.advance_upgrade(1.0, 1.0, 1.0));
        assert!(instance.advance_upgrade(0.5, 2.0, 1.0));
        assert_eq!(instance.level, 3);
        assert!(!instance.is_upgrading());
    }

    #[test]
    fn test_step_upgrade_ignores_negative_work() {
        assert_eq!(step_upgrade(1.0, -5.0, 3.0), UpgradeStep::Running(1.0));
        assert_eq!(step_upgrade(0.0, 0.0, 0.0), UpgradeStep::Complete);
    }
}
