//! Property tests for the pure formulas.
//!
//! Each property holds for the default balance and for any sensible
//! tuning, so the inputs range over both.

use bastion_core::boosts::{combined_multiplier, BoostInstance, BoostScope};
use bastion_core::buildings::calculate_upgrade_cost;
use bastion_core::combat::roll_burst;
use bastion_core::config::{EfficiencyConfig, PrestigeConfig, WaveConfig};
use bastion_core::efficiency::{calculate_efficiency, milestone_bonus};
use bastion_core::prestige::calculate_blueprints_earned;
use bastion_core::waves::calculate_wave_timer;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// =============================================================================
// Efficiency
// =============================================================================

fn effective(n: u32, config: &EfficiencyConfig) -> f64 {
    calculate_efficiency(n, false, config).effective_workers
}

proptest! {
    // `n` stays within the builder pool cap, where each extra worker still
    // adds more than f64 rounding can swallow.
    #[test]
    fn prop_effective_workers_increase(n in 0u32..50, decay in 0.6f64..0.99) {
        let config = EfficiencyConfig { decay, ..EfficiencyConfig::default() };
        prop_assert!(effective(n + 1, &config) > effective(n, &config));
    }

    #[test]
    fn prop_marginal_worker_diminishes_between_milestones(n in 1u32..50, decay in 0.6f64..0.99) {
        let config = EfficiencyConfig { decay, ..EfficiencyConfig::default() };
        let same_milestone = milestone_bonus(n, &config) == milestone_bonus(n + 2, &config);
        prop_assume!(same_milestone);
        let first = effective(n + 1, &config) - effective(n, &config);
        let second = effective(n + 2, &config) - effective(n + 1, &config);
        prop_assert!(second <= first + 1e-12);
    }

    #[test]
    fn prop_passive_baseline_adds_one_worker(n in 0u32..50) {
        let config = EfficiencyConfig { milestones: Vec::new(), ..EfficiencyConfig::default() };
        let with = calculate_efficiency(n, true, &config).effective_workers;
        let without = calculate_efficiency(n, false, &config).effective_workers;
        prop_assert!((with - without - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_marginal_worker_jumps_at_milestone() {
    let config = EfficiencyConfig::default();
    let before = effective(4, &config) - effective(3, &config);
    let at = effective(5, &config) - effective(4, &config);
    assert!(at > before);
}

// =============================================================================
// Costs and rewards
// =============================================================================

proptest! {
    #[test]
    fn prop_upgrade_cost_strictly_increases(
        base in 10u64..10_000,
        multiplier in 1.15f64..3.0,
        level in 1u32..30,
    ) {
        prop_assert!(
            calculate_upgrade_cost(base, multiplier, level + 1) > calculate_upgrade_cost(base, multiplier, level)
        );
    }

    #[test]
    fn prop_no_blueprints_below_threshold(wave in 0u32..20) {
        prop_assert_eq!(calculate_blueprints_earned(wave, &PrestigeConfig::default()), 0);
    }

    #[test]
    fn prop_blueprints_strictly_increase_past_threshold(wave in 20u32..2_000) {
        let config = PrestigeConfig::default();
        prop_assert!(calculate_blueprints_earned(wave + 1, &config) > calculate_blueprints_earned(wave, &config));
    }

    #[test]
    fn prop_wave_timer_monotone_and_bounded(wave in 0u32..5_000) {
        let config = WaveConfig::default();
        let timer = calculate_wave_timer(wave, &config);
        prop_assert!(calculate_wave_timer(wave + 1, &config) >= timer);
        prop_assert!(timer <= config.max_timer);
    }
}

#[test]
fn test_upgrade_cost_scenario() {
    assert_eq!(calculate_upgrade_cost(100, 1.5, 2), 150);
}

// =============================================================================
// Boosts and bursts
// =============================================================================

fn arb_boost() -> impl Strategy<Value = BoostInstance> {
    (1.0f64..50.0, -1_000i64..600_000, prop_oneof![
        Just(BoostScope::All),
        Just(BoostScope::Production),
        Just(BoostScope::Combat),
    ])
        .prop_map(|(multiplier, remaining_duration_ms, scope)| BoostInstance {
            id: "boost".to_string(),
            remaining_duration_ms,
            multiplier,
            scope,
        })
}

proptest! {
    #[test]
    fn prop_combined_boost_never_exceeds_cap(
        boosts in prop::collection::vec(arb_boost(), 0..12),
        cap in 1.0f64..20.0,
    ) {
        for scope in [BoostScope::All, BoostScope::Production, BoostScope::Combat] {
            let combined = combined_multiplier(&boosts, scope, cap);
            prop_assert!(combined <= cap);
            prop_assert!(combined >= 1.0);
        }
    }

    #[test]
    fn prop_certain_burst_always_fires(seed in any::<u64>(), multiplier in 1.5f64..10.0) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        prop_assert!(roll_burst(1.0, multiplier, &mut rng) > 1.0);
        prop_assert_eq!(roll_burst(0.0, multiplier, &mut rng), 1.0);
    }
}
