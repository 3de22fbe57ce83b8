//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, offline catch-up and save/load all depend on the game being
//! 100% deterministic. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Buildings live in a `BTreeMap` and are always visited in id order.
//!
//! - **System randomness**: No calls to `thread_rng()`. Bursts, drops and
//!   special effects all draw from the game's seeded `ChaCha8Rng`.
//!
//! - **Lost RNG position**: A restored game must continue the same stream,
//!   so the word position is part of the snapshot and of the state hash.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (combat, production, etc.)
//! 2. **Property tests**: Random action scripts must still be reproducible
//! 3. **Integration tests**: Full sessions are reproducible
//! 4. **Parallel tests**: Running N games in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use bastion_core::actions::PlayerAction;
use bastion_core::config::BalanceConfig;
use bastion_core::data::Catalog;
use bastion_core::events::NullSink;
use bastion_core::simulation::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each game.
    pub hashes: Vec<u64>,
    /// Number of ticks each game ran.
    pub ticks: u64,
    /// Number of games run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all games produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all games matched.
    ///
    /// # Panics
    ///
    /// Panics if games produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel games diverged!\n\
                 Games: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for [`Game`].
///
/// Runs the game twice with identical setup, ticking `delta_ms` each step,
/// and verifies the final state hashes match exactly.
pub fn verify_game_determinism<F>(setup_fn: F, num_ticks: u64, delta_ms: i64) -> bool
where
    F: Fn() -> Game,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |game| {
            game.tick(delta_ms, &mut NullSink);
        },
        Game::state_hash,
    );
    result.is_deterministic
}

/// Run N games in parallel using scoped threads and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_games_scoped<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Game + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    for _ in 0..num_ticks {
                        game.tick(100, &mut NullSink);
                    }
                    game.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("game thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two games tick-by-tick, finding first divergence.
///
/// `script` is asked for the actions to issue before each tick.
///
/// # Returns
///
/// `None` if the games stay identical, `Some(tick)` if they diverge at
/// that tick.
pub fn find_first_divergence<F, S>(setup_fn: F, script: S, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Game,
    S: Fn(u64) -> Vec<PlayerAction>,
{
    let mut game1 = setup_fn();
    let mut game2 = setup_fn();

    if game1.state_hash() != game2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        for action in script(tick) {
            let _ = game1.apply_action(&action, &mut NullSink);
            let _ = game2.apply_action(&action, &mut NullSink);
        }
        game1.tick(100, &mut NullSink);
        game2.tick(100, &mut NullSink);

        if game1.state_hash() != game2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Run a scripted session: `(actions, delta_ms)` per step.
pub fn run_script(game: &mut Game, script: &[(Vec<PlayerAction>, i64)]) {
    for (actions, delta_ms) in script {
        for action in actions {
            let _ = game.apply_action(action, &mut NullSink);
        }
        game.tick(*delta_ms, &mut NullSink);
    }
}

/// Verify that a save/load round trip preserves the game exactly, and that
/// the restored game keeps evolving identically to the original.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Game,
{
    let mut game = setup_fn();

    for _ in 0..num_ticks {
        let _ = game.tap(false, &mut NullSink);
        game.tick(100, &mut NullSink);
    }

    let Ok(bytes) = game.serialize() else {
        return false;
    };
    let Ok(mut restored) = Game::deserialize(game.config().clone(), Catalog::standard(), &bytes) else {
        return false;
    };
    if restored.state_hash() != game.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        let _ = game.tap(true, &mut NullSink);
        let _ = restored.tap(true, &mut NullSink);
        game.tick(100, &mut NullSink);
        restored.tick(100, &mut NullSink);
    }
    restored.state_hash() == game.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Default balance, for setups that need to name it.
#[must_use]
pub fn default_config() -> BalanceConfig {
    BalanceConfig::default()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use bastion_core::actions::PlayerAction;
    use bastion_core::boosts::BoostScope;
    use proptest::prelude::*;

    /// Building ids of the standard catalog.
    pub const BUILDING_IDS: &[&str] = &[
        "command_center",
        "scrap_collector",
        "salvage_yard",
        "foundry",
        "turret",
        "railgun",
        "salvage_drone_bay",
        "targeting_array",
        "weakpoint_scanner",
        "chrono_beacon",
    ];

    /// Upgrade ids of the standard catalog.
    pub const UPGRADE_IDS: &[&str] = &[
        "reinforced_tools",
        "heavy_gauntlets",
        "overclocked_turrets",
        "salvage_contracts",
        "archive_access",
        "shaped_charges",
        "hair_trigger",
        "night_shift",
        "standing_reserve",
    ];

    /// Generate a building id, occasionally an unknown one.
    pub fn arb_building_id() -> impl Strategy<Value = String> {
        prop_oneof![
            9 => proptest::sample::select(BUILDING_IDS).prop_map(str::to_string),
            1 => Just("moon_laser".to_string()),
        ]
    }

    /// Generate a boost scope.
    pub fn arb_scope() -> impl Strategy<Value = BoostScope> {
        prop_oneof![
            Just(BoostScope::All),
            Just(BoostScope::Production),
            Just(BoostScope::Combat),
        ]
    }

    /// Generate a builder or building action.
    pub fn arb_building_action() -> impl Strategy<Value = PlayerAction> {
        prop_oneof![
            4 => arb_building_id().prop_map(|building| PlayerAction::AssignBuilder { building }),
            2 => arb_building_id().prop_map(|building| PlayerAction::UnassignBuilder { building }),
            2 => (arb_building_id(), arb_building_id())
                .prop_map(|(from, to)| PlayerAction::ReassignBuilder { from, to }),
            2 => arb_building_id().prop_map(|building| PlayerAction::UpgradeBuilding { building }),
        ]
    }

    /// Generate a prestige, grant or control action.
    pub fn arb_meta_action() -> impl Strategy<Value = PlayerAction> {
        prop_oneof![
            proptest::sample::select(UPGRADE_IDS)
                .prop_map(|id| PlayerAction::PurchaseUpgrade { upgrade: id.to_string() }),
            Just(PlayerAction::ExecutePrestige),
            Just(PlayerAction::PurchaseBuilder),
            (0u32..8).prop_map(|count| PlayerAction::GrantBuilders { count }),
            (0.5f64..4.0, -1_000i64..120_000, arb_scope()).prop_map(
                |(multiplier, duration_ms, scope)| PlayerAction::ApplyBoost {
                    multiplier,
                    duration_ms,
                    scope,
                }
            ),
            Just(PlayerAction::Pause),
            Just(PlayerAction::Resume),
        ]
    }

    /// Generate any player action, including ones that will be rejected.
    pub fn arb_action() -> impl Strategy<Value = PlayerAction> {
        prop_oneof![
            5 => arb_building_action(),
            3 => any::<bool>().prop_map(|weak_point| PlayerAction::Tap { weak_point }),
            2 => arb_meta_action(),
        ]
    }

    /// Generate a tick delta, including zero, negative and long frames.
    pub fn arb_delta_ms() -> impl Strategy<Value = i64> {
        prop_oneof![
            6 => Just(100i64),
            2 => 1i64..1_000,
            1 => -100i64..=0,
            1 => 1_000i64..60_000,
        ]
    }

    /// Generate a session script: actions issued before each tick.
    pub fn arb_script(max_steps: usize) -> impl Strategy<Value = Vec<(Vec<PlayerAction>, i64)>> {
        proptest::collection::vec(
            (proptest::collection::vec(arb_action(), 0..3), arb_delta_ms()),
            1..max_steps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{staffed_game, standard_game};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_fresh_game_determinism() {
        assert!(verify_game_determinism(|| standard_game(1), 600, 100));
    }

    #[test]
    fn test_staffed_game_determinism() {
        assert!(verify_game_determinism(|| staffed_game(9), 600, 250));
    }

    #[test]
    fn test_different_seeds_diverge_on_taps() {
        let tapping = |seed| {
            let mut game = standard_game(seed);
            for _ in 0..100 {
                let _ = game.tap(true, &mut NullSink);
                game.tick(100, &mut NullSink);
            }
            game.state_hash()
        };
        assert_ne!(tapping(1), tapping(2));
    }

    #[test]
    fn test_find_divergence_on_deterministic_game() {
        let script = |tick: u64| {
            if tick % 3 == 0 {
                vec![PlayerAction::Tap { weak_point: true }]
            } else {
                Vec::new()
            }
        };
        assert_eq!(find_first_divergence(|| standard_game(4), script, 300), None);
    }

    #[test]
    fn test_serialization_preserves_game() {
        assert!(verify_serialization_determinism(|| staffed_game(5), 150));
    }

    #[test]
    fn test_parallel_games() {
        let result = run_parallel_games_scoped(|| staffed_game(11), 4, 500);
        result.assert_deterministic();
    }

    proptest! {
        /// Any script of actions and deltas replays to the same state.
        #[test]
        fn prop_scripts_are_replayable(script in strategies::arb_script(40), seed in any::<u64>()) {
            let run = || {
                let mut game = standard_game(seed);
                run_script(&mut game, &script);
                game.state_hash()
            };
            prop_assert_eq!(run(), run());
        }

        /// Saving at any point and continuing gives the same result as not saving.
        #[test]
        fn prop_save_anywhere_is_transparent(
            script in strategies::arb_script(30),
            split in 0usize..30,
        ) {
            let split = split.min(script.len());
            let (before, after) = script.split_at(split);

            let mut straight = standard_game(77);
            run_script(&mut straight, &script);

            let mut first = standard_game(77);
            run_script(&mut first, before);
            let bytes = first.serialize().expect("serialize");
            let mut resumed = Game::deserialize(default_config(), Catalog::standard(), &bytes)
                .expect("deserialize");
            run_script(&mut resumed, after);

            prop_assert_eq!(straight.state_hash(), resumed.state_hash());
        }

        /// Whatever the script, the state invariants hold afterwards.
        #[test]
        fn prop_invariants_hold(script in strategies::arb_script(40)) {
            let mut game = standard_game(3);
            run_script(&mut game, &script);
            let problems = game.validate_invariants();
            prop_assert!(problems.is_empty(), "{:?}", problems);
        }
    }

    #[test]
    #[ignore = "Long-running stress test"]
    fn stress_test_parallel_many_games() {
        let result = run_parallel_games_scoped(|| staffed_game(21), 16, 100_000);
        result.assert_deterministic();
    }
}
