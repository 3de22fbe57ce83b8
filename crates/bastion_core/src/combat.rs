//! Combat resolution: taps, bursts, automatic damage and scrap from damage.
//!
//! Damage functions are pure apart from the random draws, which always come
//! from the caller's seeded RNG. The combat step never touches the wave
//! timer; the simulation counts it down separately before resolving the
//! outcome.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buildings::BuildingInstance;
use crate::config::{BalanceConfig, CombatConfig};
use crate::data::{BuildingRole, Catalog};
use crate::math::{clamp_chance, split_whole, tier_lookup};
use crate::production::building_output;
use crate::waves::EnemyInstance;

/// Per-session combat state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatState {
    /// Whether an enemy is being fought.
    pub is_active: bool,
    /// The enemy being fought.
    pub current_enemy: Option<EnemyInstance>,
    /// Seconds left on the wave timer.
    pub wave_timer: f64,
    /// Timer at wave start.
    pub wave_timer_max: f64,
    /// Base burst chance before bonuses.
    pub burst_chance: f64,
    /// Damage multiplier of a burst.
    pub burst_multiplier: f64,
    /// Total scrap value of the current wave.
    pub wave_reward: f64,
    /// Fractional scrap-from-damage carried between hits.
    pub scrap_carry: f64,
}

impl Default for CombatState {
    fn default() -> Self {
        Self::new(&CombatConfig::default())
    }
}

impl CombatState {
    /// Inactive combat with burst stats from the config.
    #[must_use]
    pub fn new(config: &CombatConfig) -> Self {
        Self {
            is_active: false,
            current_enemy: None,
            wave_timer: 0.0,
            wave_timer_max: 0.0,
            burst_chance: config.base_burst_chance,
            burst_multiplier: config.burst_multiplier,
            wave_reward: 0.0,
            scrap_carry: 0.0,
        }
    }

    /// Start fighting `enemy` with a fresh timer.
    pub fn begin_wave(&mut self, enemy: EnemyInstance, timer: f64, wave_reward: f64) {
        self.current_enemy = Some(enemy);
        self.is_active = true;
        self.wave_timer = timer.max(0.0);
        self.wave_timer_max = self.wave_timer;
        self.wave_reward = wave_reward.max(0.0);
        self.scrap_carry = 0.0;
    }

    /// Stop fighting.
    pub fn end_wave(&mut self) {
        self.is_active = false;
        self.current_enemy = None;
        self.wave_timer = 0.0;
        self.scrap_carry = 0.0;
    }

    /// Count the wave timer down, never below zero.
    pub fn count_down(&mut self, delta_seconds: f64) {
        if self.is_active && delta_seconds > 0.0 {
            self.wave_timer = (self.wave_timer - delta_seconds).clamp(0.0, self.wave_timer_max);
        }
    }

    /// Enemy that can still take damage.
    #[must_use]
    pub fn live_enemy(&self) -> Option<&EnemyInstance> {
        self.current_enemy
            .as_ref()
            .filter(|e| self.is_active && !e.is_defeated())
    }
}

/// Multipliers applied to tap and automatic damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatModifiers {
    /// Prestige tap power multiplier.
    pub prestige_tap_power: f64,
    /// Prestige auto damage multiplier.
    pub prestige_auto_damage: f64,
    /// Prestige burst chance bonus (additive).
    pub prestige_burst_chance: f64,
    /// Prestige burst damage multiplier.
    pub prestige_burst_damage: f64,
    /// Multiplier from the highest combat building tier.
    pub tier_multiplier: f64,
    /// Combined combat boost.
    pub boost: f64,
    /// `1 + sum` of active damage synergies.
    pub synergy_damage: f64,
    /// `1 + sum` of active efficiency synergies.
    pub synergy_efficiency: f64,
    /// Burst chance from the burst-boost special effect.
    pub burst_boost: f64,
    /// Critical-weakness proc chance; 0 when the effect is inert.
    pub critical_chance: f64,
    /// Critical-weakness damage multiplier.
    pub critical_multiplier: f64,
}

impl Default for CombatModifiers {
    fn default() -> Self {
        Self {
            prestige_tap_power: 1.0,
            prestige_auto_damage: 1.0,
            prestige_burst_chance: 0.0,
            prestige_burst_damage: 1.0,
            tier_multiplier: 1.0,
            boost: 1.0,
            synergy_damage: 1.0,
            synergy_efficiency: 1.0,
            burst_boost: 0.0,
            critical_chance: 0.0,
            critical_multiplier: 1.0,
        }
    }
}

/// Damage breakdown of one tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapResult {
    /// Final damage.
    pub damage: f64,
    /// Burst multiplier applied (1 when no burst).
    pub burst_multiplier: f64,
    /// The tap landed on a weak point.
    pub weak_point: bool,
    /// Critical weakness replaced the weak-point multiplier.
    pub critical: bool,
}

impl TapResult {
    /// Check whether a burst triggered.
    #[must_use]
    pub fn is_burst(&self) -> bool {
        self.burst_multiplier > 1.0
    }
}

/// Outcome of the combat state after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    /// Keep fighting.
    Continue,
    /// Enemy health reached zero.
    EnemyDefeated,
    /// The timer ran out first.
    TimerExpired,
}

/// Roll a burst: returns `multiplier` on success, 1 otherwise.
///
/// `chance` is clamped into `[0, 1]`, so 1 always triggers and 0 never does.
pub fn roll_burst<R: Rng + ?Sized>(chance: f64, multiplier: f64, rng: &mut R) -> f64 {
    let chance = clamp_chance(chance);
    if rng.gen::<f64>() < chance {
        multiplier
    } else {
        1.0
    }
}

/// Burst chance from all sources, capped at `max_burst_chance`.
#[must_use]
pub fn total_burst_chance(state: &CombatState, modifiers: &CombatModifiers, config: &CombatConfig) -> f64 {
    (state.burst_chance + modifiers.prestige_burst_chance + modifiers.burst_boost)
        .min(config.max_burst_chance)
        .max(0.0)
}

/// Damage multiplier from the highest evolution tier among unlocked combat
/// buildings; 1 when there are none.
#[must_use]
pub fn tier_multiplier(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &CombatConfig,
) -> f64 {
    buildings
        .values()
        .filter(|b| b.is_unlocked)
        .filter(|b| {
            catalog
                .building(&b.type_id)
                .is_some_and(|def| def.role == BuildingRole::Combat)
        })
        .map(|b| b.evolution_tier)
        .max()
        .map_or(1.0, |tier| tier_lookup(&config.tier_multipliers, tier))
}

/// Compute one tap's damage.
pub fn calculate_tap_damage<R: Rng + ?Sized>(
    state: &CombatState,
    modifiers: &CombatModifiers,
    config: &CombatConfig,
    weak_point: bool,
    rng: &mut R,
) -> TapResult {
    let (low, high) = (config.tap_variance_min, config.tap_variance_max);
    let variance = if high > low { rng.gen_range(low..high) } else { low };

    let burst_chance = total_burst_chance(state, modifiers, config);
    let burst_multiplier = roll_burst(
        burst_chance,
        state.burst_multiplier * modifiers.prestige_burst_damage,
        rng,
    );

    let mut critical = false;
    let weak_multiplier = if weak_point {
        if modifiers.critical_chance > 0.0 && rng.gen::<f64>() < clamp_chance(modifiers.critical_chance) {
            critical = true;
            modifiers.critical_multiplier
        } else {
            config.weak_point_multiplier
        }
    } else {
        1.0
    };

    let damage = config.base_tap_damage
        * variance
        * modifiers.prestige_tap_power
        * modifiers.tier_multiplier
        * modifiers.boost
        * modifiers.synergy_damage
        * burst_multiplier
        * weak_multiplier;

    TapResult {
        damage: damage.max(0.0),
        burst_multiplier,
        weak_point,
        critical,
    }
}

/// Automatic damage per second from every combat building.
#[must_use]
pub fn auto_damage_per_second(
    buildings: &BTreeMap<String, BuildingInstance>,
    catalog: &Catalog,
    config: &BalanceConfig,
    modifiers: &CombatModifiers,
) -> f64 {
    let base: f64 = buildings
        .values()
        .filter_map(|b| {
            let def = catalog.building(&b.type_id)?;
            (def.role == BuildingRole::Combat)
                .then(|| building_output(def, b, config, modifiers.synergy_efficiency))
        })
        .sum();
    base * modifiers.prestige_auto_damage * modifiers.tier_multiplier * modifiers.boost * modifiers.synergy_damage
}

/// Apply damage to the live enemy; returns the health actually removed.
pub fn apply_damage(state: &mut CombatState, damage: f64) -> f64 {
    if !state.is_active || damage <= 0.0 {
        return 0.0;
    }
    let Some(enemy) = state.current_enemy.as_mut() else {
        return 0.0;
    };
    let dealt = damage.min(enemy.current_health.max(0.0));
    enemy.current_health -= dealt;
    dealt
}

/// Scrap earned for removing `dealt` health, with fractional carry.
///
/// Returns `(whole_scrap, new_carry)`.
#[must_use]
pub fn scrap_from_damage(dealt: f64, max_health: f64, wave_reward: f64, fraction: f64, carry: f64) -> (u64, f64) {
    if dealt <= 0.0 || max_health <= 0.0 {
        return (0, carry);
    }
    let earned = (dealt / max_health).min(1.0) * wave_reward * fraction;
    split_whole(carry + earned)
}

/// Apply damage and pay the proportional scrap share in one step.
pub fn strike(state: &mut CombatState, damage: f64, fraction: f64) -> (f64, u64) {
    let dealt = apply_damage(state, damage);
    let max_health = state.current_enemy.as_ref().map_or(0.0, |e| e.max_health);
    let (scrap, carry) = scrap_from_damage(dealt, max_health, state.wave_reward, fraction, state.scrap_carry);
    state.scrap_carry = carry;
    (dealt, scrap)
}

/// Decide how the current wave stands.
#[must_use]
pub fn check_outcome(state: &CombatState) -> CombatOutcome {
    let Some(enemy) = state.current_enemy.as_ref().filter(|_| state.is_active) else {
        return CombatOutcome::Continue;
    };
    if enemy.is_defeated() {
        CombatOutcome::EnemyDefeated
    } else if state.wave_timer <= 0.0 {
        CombatOutcome::TimerExpired
    } else {
        CombatOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_enemy(health: f64) -> EnemyInstance {
        EnemyInstance {
            id: "drone-w1".into(),
            tier_id: "drone".into(),
            name: "Drone".into(),
            current_health: health,
            max_health: health,
            reward: 10.0,
            wave: 1,
            is_boss: false,
            is_final_boss: false,
        }
    }

    fn active_state(health: f64) -> CombatState {
        let mut state = CombatState::new(&CombatConfig::default());
        state.begin_wave(create_test_enemy(health), 30.0, 100.0);
        state
    }

    #[test]
    fn test_roll_burst_certain_and_impossible() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1_000 {
            let burst = roll_burst(1.0, 3.0, &mut rng);
            assert!(burst > 1.0);
            assert_eq!(roll_burst(0.0, 3.0, &mut rng), 1.0);
        }
    }

    #[test]
    fn test_roll_burst_clamps_chance() {
        // StepRng at u64::MAX yields the largest f64 below 1.
        let mut high = StepRng::new(u64::MAX, 0);
        assert_eq!(roll_burst(7.5, 2.0, &mut high), 2.0);
        let mut low = StepRng::new(0, 0);
        assert_eq!(roll_burst(-1.0, 2.0, &mut low), 1.0);
    }

    #[test]
    fn test_total_burst_chance_capped() {
        let state = active_state(100.0);
        let config = CombatConfig::default();
        let modifiers = CombatModifiers {
            prestige_burst_chance: 0.5,
            burst_boost: 0.5,
            ..CombatModifiers::default()
        };
        assert_eq!(total_burst_chance(&state, &modifiers, &config), config.max_burst_chance);
    }

    #[test]
    fn test_tap_damage_within_variance() {
        let state = active_state(100.0);
        let config = CombatConfig {
            base_burst_chance: 0.0,
            ..CombatConfig::default()
        };
        let state = CombatState {
            burst_chance: config.base_burst_chance,
            ..state
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let tap = calculate_tap_damage(&state, &CombatModifiers::default(), &config, false, &mut rng);
            assert!(tap.damage >= 9.0 && tap.damage < 11.0);
            assert!(!tap.is_burst());
        }
    }

    #[test]
    fn test_weak_point_and_critical() {
        let config = CombatConfig {
            base_burst_chance: 0.0,
            tap_variance_min: 1.0,
            tap_variance_max: 1.0,
            ..CombatConfig::default()
        };
        let mut state = active_state(100.0);
        state.burst_chance = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let weak = calculate_tap_damage(&state, &CombatModifiers::default(), &config, true, &mut rng);
        assert_eq!(weak.damage, 20.0);
        assert!(!weak.critical);

        let modifiers = CombatModifiers {
            critical_chance: 1.0,
            critical_multiplier: 5.0,
            ..CombatModifiers::default()
        };
        let crit = calculate_tap_damage(&state, &modifiers, &config, true, &mut rng);
        assert_eq!(crit.damage, 50.0);
        assert!(crit.critical);
    }

    #[test]
    fn test_damage_clamped_to_remaining_health() {
        let mut state = active_state(50.0);
        assert_eq!(apply_damage(&mut state, 30.0), 30.0);
        assert_eq!(apply_damage(&mut state, 30.0), 20.0);
        assert_eq!(apply_damage(&mut state, 30.0), 0.0);
        assert_eq!(check_outcome(&state), CombatOutcome::EnemyDefeated);
    }

    #[test]
    fn test_scrap_from_damage_carries_fraction() {
        let mut state = active_state(1_000.0);
        // 1% of health is 0.5 scrap at a 50% share of 100.
        let (_, scrap) = strike(&mut state, 10.0, 0.5);
        assert_eq!(scrap, 0);
        let (_, scrap) = strike(&mut state, 10.0, 0.5);
        assert_eq!(scrap, 1);

        let (_, scrap) = strike(&mut state, 5_000.0, 0.5);
        assert_eq!(scrap, 49);
    }

    #[test]
    fn test_timer_expiry_outcome() {
        let mut state = active_state(100.0);
        state.count_down(10.0);
        assert_eq!(check_outcome(&state), CombatOutcome::Continue);
        state.count_down(100.0);
        assert_eq!(state.wave_timer, 0.0);
        assert_eq!(check_outcome(&state), CombatOutcome::TimerExpired);
    }

    #[test]
    fn test_auto_damage_uses_combat_buildings() {
        let catalog = Catalog::standard();
        let config = BalanceConfig::default();
        let buildings: BTreeMap<_, _> = catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, 1)))
            .collect();

        // Wave 1: only the turret is an unlocked combat building.
        let dps = auto_damage_per_second(&buildings, &catalog, &config, &CombatModifiers::default());
        assert!((dps - 2.0).abs() < 1e-9);
        assert_eq!(tier_multiplier(&buildings, &catalog, &config.combat), 1.0);
    }
}
