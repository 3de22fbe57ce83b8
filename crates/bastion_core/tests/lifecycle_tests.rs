//! End-to-end runs through the public `Game` API.
//!
//! These cover the loops a player actually goes through: staff, fight,
//! prestige, spend blueprints, save, come back later.

use std::sync::mpsc;

use bastion_core::prelude::*;
use bastion_test_utils::determinism::verify_game_determinism;
use bastion_test_utils::fixtures::{clear_current_wave, rich_game_at_wave, staffed_game, DEFAULT_SEED};

fn assert_invariants(game: &Game) {
    let problems = game.validate_invariants();
    assert!(problems.is_empty(), "invariants broken: {problems:?}");
}

#[test]
fn test_prestige_cycle_keeps_meta_progress() {
    let mut game = rich_game_at_wave(DEFAULT_SEED, 25, 0, 100_000);
    game.assign_builder("scrap_collector", &mut NullSink).unwrap();
    game.upgrade_building("scrap_collector", &mut NullSink).unwrap();
    for _ in 0..20 {
        game.tick(100, &mut NullSink);
    }
    assert!(game.building("scrap_collector").unwrap().level > 1);

    let outcome = game.execute_prestige(&mut NullSink).unwrap();
    assert_eq!(outcome.blueprints_earned, 15);
    assert_eq!(game.player().current_wave, 1);
    assert!(game.buildings().values().all(|b| b.level == 1));
    assert_eq!(game.player().builders.available, game.player().builders.total);
    assert_invariants(&game);

    let bought = game.purchase_upgrade("reinforced_tools", &mut NullSink).unwrap();
    assert_eq!(bought.level, 1);
    assert_eq!(game.purchase_builder(&mut NullSink).unwrap(), 5);
    assert_eq!(game.player().blueprints, 5);
    assert_eq!(game.player().builders.total, 4);

    // A second reset keeps everything bought with blueprints.
    let mut snapshot = game.snapshot();
    snapshot.player.current_wave = 20;
    let (mut game, _) = Game::from_snapshot(BalanceConfig::default(), Catalog::standard(), snapshot).unwrap();
    game.execute_prestige(&mut NullSink).unwrap();
    assert_eq!(game.player().prestige_count, 2);
    assert_eq!(game.player().highest_wave, 25);
    assert_eq!(game.player().prestige_upgrades.get("reinforced_tools"), Some(&1));
    assert_eq!(game.player().builders.total, 4);
    assert_eq!(game.player().blueprints, 15);
}

#[test]
fn test_ron_save_resumes_identically() {
    let mut game = staffed_game(DEFAULT_SEED);
    clear_current_wave(&mut game, 100, 400).unwrap();
    for _ in 0..123 {
        game.tick(100, &mut NullSink);
    }

    let ron = game.snapshot().to_ron().unwrap();
    let (mut restored, report) = Game::from_snapshot(
        BalanceConfig::default(),
        Catalog::standard(),
        GameSnapshot::from_ron(&ron).unwrap(),
    )
    .unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(restored.state_hash(), game.state_hash());

    for _ in 0..500 {
        let _ = game.tap(false, &mut NullSink);
        let _ = restored.tap(false, &mut NullSink);
        game.tick(100, &mut NullSink);
        restored.tick(100, &mut NullSink);
    }
    assert_eq!(restored.state_hash(), game.state_hash());
}

#[test]
fn test_events_over_a_channel() {
    let (tx, rx) = mpsc::channel();
    let mut sink = tx;
    let mut game = staffed_game(DEFAULT_SEED);
    for _ in 0..300 {
        let _ = game.tap(true, &mut sink);
        game.tick(100, &mut sink);
    }
    drop(sink);

    let events: Vec<GameEvent> = rx.iter().collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::WaveCleared { wave: 1, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::ResourceGained {
            resource: Resource::Scrap,
            source: GainSource::Production,
            ..
        }
    )));
}

#[test]
fn test_rejected_actions_leave_state_untouched() {
    let mut game = staffed_game(DEFAULT_SEED);
    let before = game.state_hash();

    assert!(game.assign_builder("scrap_collector", &mut NullSink).is_err());
    assert!(game.unassign_builder("foundry", &mut NullSink).is_err());
    assert!(game.upgrade_building("no_such_building", &mut NullSink).is_err());
    assert!(game.purchase_upgrade("no_such_upgrade", &mut NullSink).is_err());
    assert!(game.purchase_builder(&mut NullSink).is_err());
    assert!(game.execute_prestige(&mut NullSink).is_err());
    assert!(game.apply_boost(0.5, 1_000, &mut NullSink).is_err());
    assert!(game.grant_builders(0, &mut NullSink).is_err());

    assert_eq!(game.state_hash(), before);
}

#[test]
fn test_long_idle_session_holds_invariants() {
    let mut game = staffed_game(9);
    game.grant_builders(20, &mut NullSink).unwrap();
    for building in ["scrap_collector", "turret", "scrap_collector", "turret"] {
        game.assign_builder(building, &mut NullSink).unwrap();
    }
    let boost = game.apply_boost(3.0, 60_000, &mut NullSink).unwrap();
    for tick in 0..6_000 {
        game.tick(100, &mut NullSink);
        if tick % 500 == 0 {
            assert_invariants(&game);
        }
    }
    assert_invariants(&game);
    assert!(game.player().active_boosts.iter().all(|b| b.id != boost));
}

#[test]
fn test_staffed_game_is_deterministic() {
    assert!(verify_game_determinism(|| staffed_game(DEFAULT_SEED), 2_000, 100));
}
