//! Balance configuration.
//!
//! Every tunable number the systems use lives here, grouped per subsystem.
//! All sections are `#[serde(default)]`, so a RON file only needs to name the
//! values it overrides:
//!
//! ```ron
//! BalanceConfig(
//!     combat: (base_tap_damage: 25.0),
//!     waves: (boss_interval: 5),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Top-level balance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Wall-clock interval of the periodic tick driven by the host.
    pub tick_interval_ms: u32,
    /// Worker efficiency curve.
    pub efficiency: EfficiencyConfig,
    /// Resource production.
    pub production: ProductionConfig,
    /// Tap and auto damage.
    pub combat: CombatConfig,
    /// Enemy waves, timers and rewards.
    pub waves: WaveConfig,
    /// Building special effects.
    pub effects: SpecialEffectsConfig,
    /// Prestige and blueprints.
    pub prestige: PrestigeConfig,
    /// Timed boosts.
    pub boosts: BoostConfig,
    /// Builder pool and builder purchases.
    pub builders: BuilderConfig,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            efficiency: EfficiencyConfig::default(),
            production: ProductionConfig::default(),
            combat: CombatConfig::default(),
            waves: WaveConfig::default(),
            effects: SpecialEffectsConfig::default(),
            prestige: PrestigeConfig::default(),
            boosts: BoostConfig::default(),
            builders: BuilderConfig::default(),
        }
    }
}

impl BalanceConfig {
    /// Parse a configuration from RON text.
    ///
    /// `source_name` is only used in error messages.
    pub fn from_ron_str(source: &str, source_name: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::SerializeError(e.to_string()))
    }

    /// Check the values that the formulas rely on.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.tick_interval_ms == 0 {
            errors.push("tick_interval_ms must be positive".to_string());
        }
        // Every extra worker must be worth strictly less than the last.
        if !(self.efficiency.decay > 0.0 && self.efficiency.decay < 1.0) {
            errors.push("efficiency.decay must be in (0, 1)".to_string());
        }
        let mut last_bonus = 1.0;
        let mut last_workers = 0;
        for milestone in &self.efficiency.milestones {
            if milestone.workers <= last_workers {
                errors.push("efficiency.milestones must be sorted by workers".to_string());
            }
            if milestone.bonus < last_bonus {
                errors.push("efficiency.milestones bonuses must not decrease".to_string());
            }
            last_workers = milestone.workers;
            last_bonus = milestone.bonus;
        }
        if self.combat.tap_variance_min > self.combat.tap_variance_max {
            errors.push("combat.tap_variance_min exceeds tap_variance_max".to_string());
        }
        if !(0.0..=1.0).contains(&self.combat.scrap_from_damage_fraction) {
            errors.push("combat.scrap_from_damage_fraction must be in [0, 1]".to_string());
        }
        if self.waves.max_timer > self.waves.timer_ceiling {
            errors.push("waves.max_timer exceeds waves.timer_ceiling".to_string());
        }
        if self.waves.boss_interval == 0 {
            errors.push("waves.boss_interval must be positive".to_string());
        }
        if self.prestige.min_prestige_wave == 0 {
            errors.push("prestige.min_prestige_wave must be positive".to_string());
        }
        let min_cooldown = self.effects.scrap_find.min_cooldown;
        if min_cooldown.is_nan() || min_cooldown <= 0.0 {
            errors.push("effects.scrap_find.min_cooldown must be positive".to_string());
        }
        if self.boosts.max_combined_multiplier < 1.0 {
            errors.push("boosts.max_combined_multiplier must be at least 1".to_string());
        }
        if self.builders.starting_builders > self.builders.max_builders {
            errors.push("builders.starting_builders exceeds max_builders".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::ValidationError { errors })
        }
    }
}

/// A worker-count threshold that multiplies the summed worker efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Assigned workers needed to reach this milestone.
    pub workers: u32,
    /// Multiplier applied to the summed efficiency.
    pub bonus: f64,
}

/// Worker efficiency curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    /// Count an idle building as one fully efficient worker.
    pub include_passive_baseline: bool,
    /// Geometric decay of each additional worker's contribution.
    pub decay: f64,
    /// Milestones sorted by worker count.
    pub milestones: Vec<Milestone>,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            include_passive_baseline: true,
            decay: 0.9,
            milestones: vec![
                Milestone {
                    workers: 5,
                    bonus: 1.10,
                },
                Milestone {
                    workers: 10,
                    bonus: 1.25,
                },
                Milestone {
                    workers: 20,
                    bonus: 1.50,
                },
            ],
        }
    }
}

/// Resource production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Flat production bonus per level above 1.
    pub level_bonus: f64,
    /// `k` in `1 + log10(wave + 1) * k`.
    pub wave_bonus_factor: f64,
    /// Building whose output becomes a global production percentage.
    pub command_center_id: String,
    /// Cap on the offline window.
    pub max_offline_seconds: f64,
    /// Fraction of online production earned while away.
    pub offline_efficiency: f64,
    /// Seconds of upgrade work per current level (0 means instant).
    pub upgrade_seconds_per_level: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            level_bonus: 0.10,
            wave_bonus_factor: 0.25,
            command_center_id: "command_center".to_string(),
            max_offline_seconds: 8.0 * 3600.0,
            offline_efficiency: 0.5,
            upgrade_seconds_per_level: 1.0,
        }
    }
}

/// Tap and auto damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Damage of a single tap before multipliers.
    pub base_tap_damage: f64,
    /// Lower bound of the tap damage roll.
    pub tap_variance_min: f64,
    /// Upper bound of the tap damage roll.
    pub tap_variance_max: f64,
    /// Base burst chance per tap.
    pub base_burst_chance: f64,
    /// Damage multiplier of a burst.
    pub burst_multiplier: f64,
    /// Cap on the combined burst chance.
    pub max_burst_chance: f64,
    /// Multiplier for taps landing on a weak point.
    pub weak_point_multiplier: f64,
    /// Share of the wave reward paid out as damage is dealt.
    pub scrap_from_damage_fraction: f64,
    /// Damage multiplier by the highest combat building tier.
    pub tier_multipliers: Vec<f64>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_tap_damage: 10.0,
            tap_variance_min: 0.9,
            tap_variance_max: 1.1,
            base_burst_chance: 0.05,
            burst_multiplier: 3.0,
            max_burst_chance: 0.75,
            weak_point_multiplier: 2.0,
            scrap_from_damage_fraction: 0.5,
            tier_multipliers: vec![1.0, 1.5, 2.25, 3.5, 5.0],
        }
    }
}

/// Enemy waves, timers and rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Timer of wave 0 in seconds.
    pub base_timer: f64,
    /// Seconds added per wave.
    pub timer_per_wave: f64,
    /// Cap on the regular wave timer.
    pub max_timer: f64,
    /// Hard ceiling after boss and wave-extend bonuses.
    pub timer_ceiling: f64,
    /// Every Nth wave is a boss wave.
    pub boss_interval: u32,
    /// Boss health multiplier.
    pub boss_health_multiplier: f64,
    /// Boss reward multiplier.
    pub boss_reward_multiplier: f64,
    /// Boss timer multiplier.
    pub boss_timer_multiplier: f64,
    /// Linear completion bonus per wave.
    pub completion_linear: f64,
    /// Polynomial completion bonus coefficient.
    pub completion_poly: f64,
    /// Polynomial completion bonus exponent.
    pub completion_exponent: f64,
    /// Waves per reward step.
    pub reward_step_waves: u32,
    /// Bonus per reward step.
    pub reward_step_bonus: f64,
    /// Cap on the stepped reward multiplier.
    pub max_reward_multiplier: f64,
    /// Chance of a lucky boost drop on a regular clear.
    pub lucky_drop_chance: f64,
    /// Multiplier of the lucky boost.
    pub lucky_drop_multiplier: f64,
    /// Duration of the lucky boost.
    pub lucky_drop_duration_ms: i64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_timer: 30.0,
            timer_per_wave: 0.1,
            max_timer: 60.0,
            timer_ceiling: 90.0,
            boss_interval: 10,
            boss_health_multiplier: 5.0,
            boss_reward_multiplier: 3.0,
            boss_timer_multiplier: 1.5,
            completion_linear: 5.0,
            completion_poly: 0.5,
            completion_exponent: 1.5,
            reward_step_waves: 10,
            reward_step_bonus: 0.5,
            max_reward_multiplier: 10.0,
            lucky_drop_chance: 0.02,
            lucky_drop_multiplier: 2.0,
            lucky_drop_duration_ms: 30_000,
        }
    }
}

/// Scrap-find tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapFindConfig {
    /// Cooldown at level 1 with no workers.
    pub base_cooldown: f64,
    /// Cooldown reduction per level.
    pub cooldown_per_level: f64,
    /// Cooldown reduction per assigned worker.
    pub cooldown_per_worker: f64,
    /// Cooldown floor.
    pub min_cooldown: f64,
    /// Share of the current wave reward found.
    pub reward_percent: f64,
}

impl Default for ScrapFindConfig {
    fn default() -> Self {
        Self {
            base_cooldown: 30.0,
            cooldown_per_level: 0.5,
            cooldown_per_worker: 1.0,
            min_cooldown: 5.0,
            reward_percent: 0.05,
        }
    }
}

/// Burst-boost tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstBoostConfig {
    /// Chance added at level 0 with no workers.
    pub base: f64,
    /// Chance per level.
    pub per_level: f64,
    /// Chance per assigned worker.
    pub per_worker: f64,
    /// Cap on the summed bonus.
    pub cap: f64,
}

impl Default for BurstBoostConfig {
    fn default() -> Self {
        Self {
            base: 0.02,
            per_level: 0.005,
            per_worker: 0.01,
            cap: 0.25,
        }
    }
}

/// Critical-weakness tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalWeaknessConfig {
    /// Chance at level 0 with no workers.
    pub base: f64,
    /// Chance per level.
    pub per_level: f64,
    /// Chance per assigned worker.
    pub per_worker: f64,
    /// Cap on the chance.
    pub cap: f64,
    /// Damage multiplier replacing the weak-point multiplier.
    pub multiplier: f64,
}

impl Default for CriticalWeaknessConfig {
    fn default() -> Self {
        Self {
            base: 0.05,
            per_level: 0.01,
            per_worker: 0.02,
            cap: 0.5,
            multiplier: 5.0,
        }
    }
}

/// Wave-extend tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveExtendConfig {
    /// Chance at level 0.
    pub base_chance: f64,
    /// Chance per level.
    pub chance_per_level: f64,
    /// Cap on the chance.
    pub chance_cap: f64,
    /// Share of the base wave time added at tier 0.
    pub base_percent: f64,
    /// Share added per evolution tier.
    pub percent_per_tier: f64,
    /// Cap on the added share.
    pub percent_cap: f64,
}

impl Default for WaveExtendConfig {
    fn default() -> Self {
        Self {
            base_chance: 0.1,
            chance_per_level: 0.02,
            chance_cap: 0.6,
            base_percent: 0.1,
            percent_per_tier: 0.05,
            percent_cap: 0.5,
        }
    }
}

/// Building special effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialEffectsConfig {
    /// Effect strength by evolution tier.
    pub tier_multipliers: Vec<f64>,
    /// Scrap-find tuning.
    pub scrap_find: ScrapFindConfig,
    /// Burst-boost tuning.
    pub burst_boost: BurstBoostConfig,
    /// Critical-weakness tuning.
    pub critical_weakness: CriticalWeaknessConfig,
    /// Wave-extend tuning.
    pub wave_extend: WaveExtendConfig,
}

impl Default for SpecialEffectsConfig {
    fn default() -> Self {
        Self {
            tier_multipliers: vec![1.0, 1.25, 1.5, 2.0, 2.5],
            scrap_find: ScrapFindConfig::default(),
            burst_boost: BurstBoostConfig::default(),
            critical_weakness: CriticalWeaknessConfig::default(),
            wave_extend: WaveExtendConfig::default(),
        }
    }
}

/// Prestige and blueprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrestigeConfig {
    /// Minimum wave to prestige.
    pub min_prestige_wave: u32,
    /// Blueprints earned exactly at the minimum wave.
    pub blueprint_base: f64,
    /// Exponent of `wave / min_prestige_wave`.
    pub blueprint_exponent: f64,
    /// Scrap granted after every reset, before upgrade bonuses.
    pub base_starting_scrap: u64,
}

impl Default for PrestigeConfig {
    fn default() -> Self {
        Self {
            min_prestige_wave: 20,
            blueprint_base: 10.0,
            blueprint_exponent: 2.0,
            base_starting_scrap: 0,
        }
    }
}

/// Timed boosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Cap on the product of all active boosts.
    pub max_combined_multiplier: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            max_combined_multiplier: 10.0,
        }
    }
}

/// One step of the builder purchase price ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderCostTier {
    /// Applies once this many builders have been purchased.
    pub from_purchased: u32,
    /// Blueprint price per builder.
    pub cost: u64,
}

/// Builder pool and builder purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Builders in a fresh game.
    pub starting_builders: u32,
    /// Hard cap on the pool size.
    pub max_builders: u32,
    /// Price ladder sorted by `from_purchased`.
    pub purchase_tiers: Vec<BuilderCostTier>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            starting_builders: 3,
            max_builders: 50,
            purchase_tiers: vec![
                BuilderCostTier {
                    from_purchased: 0,
                    cost: 5,
                },
                BuilderCostTier {
                    from_purchased: 5,
                    cost: 10,
                },
                BuilderCostTier {
                    from_purchased: 10,
                    cost: 25,
                },
                BuilderCostTier {
                    from_purchased: 20,
                    cost: 50,
                },
            ],
        }
    }
}
