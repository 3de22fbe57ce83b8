//! Offline progress estimates.

use std::path::Path;

use bastion_core::events::NullSink;
use bastion_core::simulation::Game;
use bastion_core::state::GameSnapshot;
use serde::Serialize;

use crate::data_dir::{read_to_string, DataSet};
use crate::error::{Result, ToolError};

/// What a player would collect after being away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OfflineEstimate {
    /// Time away requested.
    pub seconds_away: f64,
    /// Time actually credited after the cap.
    pub seconds_credited: f64,
    /// Efficiency factor applied.
    pub efficiency: f64,
    /// Online production rate, boosts excluded.
    pub online_per_second: f64,
    /// Scrap collected.
    pub scrap: u64,
}

/// Load a snapshot: RON for `.ron` files, bincode otherwise.
pub fn load_snapshot(path: &Path) -> Result<GameSnapshot> {
    if path.extension().is_some_and(|ext| ext == "ron") {
        return Ok(GameSnapshot::from_ron(&read_to_string(path)?)?);
    }
    let bytes = std::fs::read(path).map_err(|e| ToolError::io(path, e))?;
    Ok(GameSnapshot::deserialize(&bytes)?)
}

/// Estimate offline earnings for `game` without changing it.
#[must_use]
pub fn estimate(game: &Game, seconds_away: f64) -> OfflineEstimate {
    let mut probe = game.clone();
    let offline = probe.apply_offline_progress(seconds_away, &mut NullSink);
    let online_per_second = if offline.seconds_credited > 0.0 && offline.efficiency > 0.0 {
        offline.scrap as f64 / (offline.seconds_credited * offline.efficiency)
    } else {
        0.0
    };
    OfflineEstimate {
        seconds_away,
        seconds_credited: offline.seconds_credited,
        efficiency: offline.efficiency,
        online_per_second,
        scrap: offline.scrap,
    }
}

/// Estimate for a saved game, or a fresh one when `snapshot` is `None`.
pub fn estimate_for(snapshot: Option<&Path>, data: &DataSet, seconds_away: f64) -> Result<OfflineEstimate> {
    let game = match snapshot {
        Some(path) => {
            let (game, report) = Game::from_snapshot(data.config.clone(), data.catalog.clone(), load_snapshot(path)?)?;
            if !report.is_clean() {
                tracing::warn!(?report, "Snapshot needed migration");
            }
            game
        }
        None => Game::new(data.config.clone(), data.catalog.clone(), 0)?,
    };
    Ok(estimate(&game, seconds_away))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_test_utils::fixtures::{staffed_game, DEFAULT_SEED};

    #[test]
    fn test_estimate_leaves_game_untouched() {
        let game = staffed_game(DEFAULT_SEED);
        let before = game.state_hash();
        let estimate = estimate(&game, 3600.0);
        assert!(estimate.scrap > 0);
        assert_eq!(game.state_hash(), before);
    }

    #[test]
    fn test_estimate_caps_time_away() {
        let game = staffed_game(DEFAULT_SEED);
        let day = estimate(&game, 86_400.0);
        let cap = game.config().production.max_offline_seconds;
        assert!((day.seconds_credited - cap).abs() < 1e-9);
        assert_eq!(day.scrap, estimate(&game, cap).scrap);
    }

    #[test]
    fn test_estimate_from_saved_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let game = staffed_game(DEFAULT_SEED);
        let ron_path = dir.path().join("save.ron");
        std::fs::write(&ron_path, game.snapshot().to_ron().unwrap()).unwrap();
        let bin_path = dir.path().join("save.bin");
        std::fs::write(&bin_path, game.snapshot().serialize().unwrap()).unwrap();

        let data = DataSet::default();
        let from_ron = estimate_for(Some(&ron_path), &data, 600.0).unwrap();
        let from_bin = estimate_for(Some(&bin_path), &data, 600.0).unwrap();
        assert_eq!(from_ron, from_bin);
        assert_eq!(from_ron, estimate(&game, 600.0));
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let err = estimate_for(Some(Path::new("/nonexistent/save.bin")), &DataSet::default(), 1.0).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }
}
