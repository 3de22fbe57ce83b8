//! Wave progression: enemy spawning, wave timers and completion rewards.

use serde::{Deserialize, Serialize};

use crate::config::WaveConfig;
use crate::data::{Catalog, EnemyTierDefinition, FinalBossDefinition};
use crate::math::to_amount;

/// The enemy currently being fought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyInstance {
    /// Instance id, unique per wave.
    pub id: String,
    /// Enemy tier or final boss id.
    pub tier_id: String,
    /// Display name.
    pub name: String,
    /// Health left.
    pub current_health: f64,
    /// Health at spawn.
    pub max_health: f64,
    /// Intrinsic scrap reward.
    pub reward: f64,
    /// Wave this enemy belongs to.
    pub wave: u32,
    /// Regular boss wave.
    pub is_boss: bool,
    /// Named final boss.
    #[serde(default)]
    pub is_final_boss: bool,
}

impl EnemyInstance {
    /// Check whether the enemy has no health left.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.current_health <= 0.0
    }

    /// Fraction of health left, in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.current_health / self.max_health).clamp(0.0, 1.0)
    }
}

/// Check whether `wave` is a regular boss wave.
#[must_use]
pub fn is_boss_wave(wave: u32, config: &WaveConfig) -> bool {
    config.boss_interval > 0 && wave > 0 && wave % config.boss_interval == 0
}

/// Enemy tier containing `wave`.
#[must_use]
pub fn tier_for_wave(catalog: &Catalog, wave: u32) -> Option<&EnemyTierDefinition> {
    catalog.enemy_tiers().iter().find(|tier| tier.contains(wave))
}

/// Scaled stat: `floor(base * multiplier^(wave - min_wave))`.
#[must_use]
pub fn scale_stat(base: f64, multiplier: f64, wave: u32, min_wave: u32) -> f64 {
    let steps = wave.saturating_sub(min_wave);
    (base * multiplier.powi(steps as i32)).floor()
}

/// Create the enemy for `wave`.
///
/// Final bosses take precedence over tier spawning. `None` when no tier
/// covers the wave.
#[must_use]
pub fn spawn_enemy_for_wave(catalog: &Catalog, config: &WaveConfig, wave: u32) -> Option<EnemyInstance> {
    if let Some(boss) = catalog.final_boss(wave) {
        return Some(spawn_final_boss(boss));
    }

    let tier = tier_for_wave(catalog, wave)?;
    let mut health = scale_stat(tier.base_health, tier.health_multiplier_per_wave, wave, tier.min_wave);
    let mut reward = scale_stat(tier.base_reward, tier.reward_multiplier_per_wave, wave, tier.min_wave);
    let is_boss = is_boss_wave(wave, config);
    if is_boss {
        health = (health * config.boss_health_multiplier).floor();
        reward = (reward * config.boss_reward_multiplier).floor();
    }

    let name = if is_boss {
        format!("{} Boss", tier.name)
    } else {
        tier.name.clone()
    };

    Some(EnemyInstance {
        id: format!("{}-w{wave}", tier.id),
        tier_id: tier.id.clone(),
        name,
        current_health: health.max(1.0),
        max_health: health.max(1.0),
        reward,
        wave,
        is_boss,
        is_final_boss: false,
    })
}

fn spawn_final_boss(boss: &FinalBossDefinition) -> EnemyInstance {
    EnemyInstance {
        id: format!("{}-w{}", boss.id, boss.wave),
        tier_id: boss.id.clone(),
        name: boss.name.clone(),
        current_health: boss.health,
        max_health: boss.health,
        reward: boss.reward,
        wave: boss.wave,
        is_boss: true,
        is_final_boss: true,
    }
}

/// Regular wave timer: `min(base + wave * per_wave, max_timer)`.
#[must_use]
pub fn calculate_wave_timer(wave: u32, config: &WaveConfig) -> f64 {
    (config.base_timer + f64::from(wave) * config.timer_per_wave).min(config.max_timer)
}

/// Timer for a spawned enemy, including boss scaling and bonus seconds,
/// bounded by `timer_ceiling`.
#[must_use]
pub fn timer_for_enemy(
    enemy: &EnemyInstance,
    catalog: &Catalog,
    config: &WaveConfig,
    extend_seconds: f64,
) -> f64 {
    let base = match catalog.final_boss(enemy.wave).filter(|_| enemy.is_final_boss) {
        Some(boss) => boss.timer_seconds,
        None if enemy.is_boss => calculate_wave_timer(enemy.wave, config) * config.boss_timer_multiplier,
        None => calculate_wave_timer(enemy.wave, config),
    };
    (base + extend_seconds.max(0.0)).clamp(0.0, config.timer_ceiling)
}

/// Stepped reward multiplier: `min(1 + bonus * floor(wave / step), max)`.
#[must_use]
pub fn reward_step_multiplier(wave: u32, config: &WaveConfig) -> f64 {
    let steps = if config.reward_step_waves == 0 {
        0
    } else {
        wave / config.reward_step_waves
    };
    (1.0 + config.reward_step_bonus * f64::from(steps)).min(config.max_reward_multiplier)
}

/// Total scrap value of a wave.
///
/// `(enemy_reward + linear * wave + poly * wave^exp) * stepped * prestige * boost`.
#[must_use]
pub fn calculate_wave_reward(
    wave: u32,
    enemy_reward: f64,
    prestige_bonus: f64,
    boost: f64,
    config: &WaveConfig,
) -> f64 {
    let wave_f = f64::from(wave);
    let completion = config.completion_linear * wave_f
        + config.completion_poly * wave_f.powf(config.completion_exponent);
    (enemy_reward + completion) * reward_step_multiplier(wave, config) * prestige_bonus * boost
}

/// Whole scrap paid on clear: the share not paid out during the fight,
/// raised by the kill-scrap synergy bonus.
#[must_use]
pub fn completion_payout(wave_reward: f64, damage_fraction: f64, kill_scrap_bonus: f64) -> u64 {
    to_amount(wave_reward * (1.0 - damage_fraction).max(0.0) * (1.0 + kill_scrap_bonus))
}
