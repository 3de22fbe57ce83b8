//! Test fixtures and helpers.
//!
//! Pre-built game states for consistent testing.

use bastion_core::config::BalanceConfig;
use bastion_core::data::Catalog;
use bastion_core::events::NullSink;
use bastion_core::simulation::Game;

/// Seed used by fixtures that don't take one.
pub const DEFAULT_SEED: u64 = 12345;

/// Fresh game with the standard catalog and default balance.
#[must_use]
pub fn standard_game(seed: u64) -> Game {
    Game::standard(seed)
}

/// Fresh game with custom balance.
///
/// # Panics
///
/// Panics if `config` fails validation.
#[must_use]
pub fn game_with_config(config: BalanceConfig, seed: u64) -> Game {
    Game::new(config, Catalog::standard(), seed).expect("fixture config must be valid")
}

/// Game jumped straight to `wave`, with buildings unlocked and evolved for
/// it and a fresh enemy spawned.
///
/// # Panics
///
/// Panics if the snapshot cannot be restored.
#[must_use]
pub fn game_at_wave(seed: u64, wave: u32) -> Game {
    let mut snapshot = Game::standard(seed).snapshot();
    snapshot.player.current_wave = wave;
    snapshot.player.highest_wave = wave;
    let (game, _) = Game::from_snapshot(BalanceConfig::default(), Catalog::standard(), snapshot)
        .expect("fixture snapshot must restore");
    game
}

/// Game at `wave` with `extra_builders` granted and the given scrap.
///
/// # Panics
///
/// Panics if the grant is rejected.
#[must_use]
pub fn rich_game_at_wave(seed: u64, wave: u32, extra_builders: u32, scrap: u64) -> Game {
    let mut snapshot = game_at_wave(seed, wave).snapshot();
    snapshot.player.scrap = scrap;
    let (mut game, _) = Game::from_snapshot(BalanceConfig::default(), Catalog::standard(), snapshot)
        .expect("fixture snapshot must restore");
    if extra_builders > 0 {
        game.grant_builders(extra_builders, &mut NullSink)
            .expect("fixture grant must succeed");
    }
    game
}

/// Assign builders one at a time, in the order given.
///
/// # Panics
///
/// Panics if any assignment is rejected.
pub fn staff(game: &mut Game, assignments: &[(&str, u32)]) {
    for &(building, count) in assignments {
        for _ in 0..count {
            game.assign_builder(building, &mut NullSink)
                .unwrap_or_else(|err| panic!("fixture could not staff {building}: {err}"));
        }
    }
}

/// Standard game with the three starting builders on the collector and
/// the turret.
#[must_use]
pub fn staffed_game(seed: u64) -> Game {
    let mut game = standard_game(seed);
    staff(&mut game, &[("scrap_collector", 2), ("turret", 1)]);
    game
}

/// Tap on weak points every tick until the current wave changes.
///
/// Returns the number of ticks taken, or `None` if `max_ticks` ran out.
pub fn clear_current_wave(game: &mut Game, delta_ms: i64, max_ticks: u32) -> Option<u32> {
    let wave = game.player().current_wave;
    for tick in 1..=max_ticks {
        let _ = game.tap(true, &mut NullSink);
        game.tick(delta_ms, &mut NullSink);
        if game.player().current_wave != wave {
            return Some(tick);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_at_wave_unlocks_buildings() {
        let game = game_at_wave(1, 30);
        assert_eq!(game.player().current_wave, 30);
        assert!(game.building("railgun").is_some_and(|b| b.is_unlocked));
        assert_eq!(game.combat().current_enemy.as_ref().map(|e| e.wave), Some(30));
        assert!(game.validate_invariants().is_empty());
    }

    #[test]
    fn test_rich_game() {
        let game = rich_game_at_wave(1, 12, 10, 5_000);
        assert_eq!(game.player().scrap, 5_000);
        assert_eq!(game.player().builders.total, 13);
    }

    #[test]
    fn test_staffed_game() {
        let game = staffed_game(3);
        assert_eq!(game.player().builders.available, 0);
        assert_eq!(game.building("scrap_collector").map(|b| b.assigned_builders), Some(2));
    }

    #[test]
    fn test_clear_first_wave() {
        let mut game = standard_game(DEFAULT_SEED);
        assert!(clear_current_wave(&mut game, 100, 300).is_some());
        assert_eq!(game.player().current_wave, 2);
    }
}
