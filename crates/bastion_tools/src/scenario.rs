//! Headless scenario runner.
//!
//! A scenario is a seed plus a list of steps; each step applies some
//! actions and then ticks. Runs are recorded, so every report comes with a
//! replay that reproduces it.

use std::path::Path;

use bastion_core::actions::PlayerAction;
use bastion_core::events::{EventSink, GameEvent, Resource};
use bastion_core::replay::{Replay, ReplayRecorder};
use bastion_core::simulation::{Game, GameView};
use serde::{Deserialize, Serialize};

use crate::data_dir::{read_to_string, DataSet};
use crate::error::{Result, ToolError};

/// A scripted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Name carried into reports and replays.
    pub name: String,
    /// Game seed.
    pub seed: u64,
    /// Tick length.
    pub tick_ms: i64,
    /// Steps, in order.
    pub steps: Vec<ScenarioStep>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            seed: 0,
            tick_ms: 100,
            steps: Vec::new(),
        }
    }
}

/// Actions followed by ticks, optionally repeated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioStep {
    /// Applied in order at the start of each repetition.
    pub actions: Vec<PlayerAction>,
    /// Ticks after the actions.
    pub ticks: u32,
    /// Times to run this step.
    pub repeat: u32,
}

impl Default for ScenarioStep {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            ticks: 0,
            repeat: 1,
        }
    }
}

impl Scenario {
    /// Parse a scenario from RON text.
    pub fn from_ron_str(source: &str, path: &Path) -> Result<Self> {
        ron::from_str(source).map_err(|e| ToolError::ScenarioParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_ron_str(&read_to_string(path)?, path)
    }

    /// Total ticks the scenario runs.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        self.steps
            .iter()
            .map(|s| u64::from(s.ticks) * u64::from(s.repeat))
            .sum()
    }
}

/// Counts of the events a run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventTally {
    /// Waves cleared.
    pub waves_cleared: u32,
    /// Waves failed.
    pub waves_failed: u32,
    /// Building upgrades completed.
    pub upgrades_completed: u32,
    /// Buildings unlocked.
    pub buildings_unlocked: u32,
    /// Buildings evolved.
    pub buildings_evolved: u32,
    /// Lucky drops.
    pub lucky_drops: u32,
    /// Burst taps.
    pub bursts: u32,
    /// Prestige resets.
    pub prestiges: u32,
    /// Scrap gained from every source.
    pub scrap_gained: u64,
    /// Blueprints gained from every source.
    pub blueprints_gained: u64,
}

impl EventSink for EventTally {
    fn emit(&mut self, event: GameEvent) {
        match event {
            GameEvent::WaveCleared { .. } => self.waves_cleared += 1,
            GameEvent::WaveFailed { .. } => self.waves_failed += 1,
            GameEvent::BuildingUpgraded { .. } => self.upgrades_completed += 1,
            GameEvent::BuildingUnlocked { .. } => self.buildings_unlocked += 1,
            GameEvent::BuildingEvolved { .. } => self.buildings_evolved += 1,
            GameEvent::LuckyDrop { .. } => self.lucky_drops += 1,
            GameEvent::BurstAttack { .. } => self.bursts += 1,
            GameEvent::PrestigeTriggered { .. } => self.prestiges += 1,
            GameEvent::ResourceGained {
                resource: Resource::Scrap,
                amount,
                ..
            } => self.scrap_gained += amount,
            GameEvent::ResourceGained {
                resource: Resource::Blueprints,
                amount,
                ..
            } => self.blueprints_gained += amount,
            _ => {}
        }
    }
}

/// An action the game refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedAction {
    /// Index of the step.
    pub step: usize,
    /// The action.
    pub action: PlayerAction,
    /// Rejection message.
    pub reason: String,
}

/// Summary of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Game seed.
    pub seed: u64,
    /// Ticks processed.
    pub ticks: u64,
    /// Game time simulated.
    pub simulated_seconds: f64,
    /// Actions accepted.
    pub actions_applied: u32,
    /// Actions refused.
    pub rejected: Vec<RejectedAction>,
    /// Event counts.
    pub events: EventTally,
    /// Derived state at the end.
    pub final_state: GameView,
    /// Hash of the final state.
    pub state_hash: u64,
}

/// Report plus the replay that reproduces it.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Summary.
    pub report: ScenarioReport,
    /// Recorded inputs.
    pub replay: Replay,
}

/// Run `scenario` against `data`.
pub fn run_scenario(scenario: &Scenario, data: &DataSet) -> Result<ScenarioRun> {
    let game = Game::new(data.config.clone(), data.catalog.clone(), scenario.seed)?;
    let mut recorder = ReplayRecorder::new(scenario.name.clone(), game)?;
    let mut tally = EventTally::default();
    let mut rejected = Vec::new();
    let mut actions_applied = 0u32;
    let mut ticks = 0u64;

    for (index, step) in scenario.steps.iter().enumerate() {
        for _ in 0..step.repeat {
            for action in &step.actions {
                match recorder.apply(action.clone(), &mut tally) {
                    Ok(()) => actions_applied += 1,
                    Err(e) => rejected.push(RejectedAction {
                        step: index,
                        action: action.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            for _ in 0..step.ticks {
                recorder.tick(scenario.tick_ms, &mut tally);
                ticks += 1;
            }
        }
    }

    let (replay, game) = recorder.finish();
    let report = ScenarioReport {
        name: scenario.name.clone(),
        seed: scenario.seed,
        ticks,
        simulated_seconds: ticks as f64 * scenario.tick_ms.max(0) as f64 / 1000.0,
        actions_applied,
        rejected,
        events: tally,
        final_state: game.view(),
        state_hash: game.state_hash(),
    };
    tracing::info!(
        scenario = %report.name,
        ticks,
        wave = report.final_state.wave,
        rejected = report.rejected.len(),
        "Scenario finished"
    );
    Ok(ScenarioRun { report, replay })
}

/// Play a recorded replay back and check its final hash.
///
/// Returns the number of ticks replayed.
pub fn verify_replay(path: &Path, data: &DataSet) -> Result<u64> {
    let replay = Replay::load(path)?;
    let ticks = replay.final_tick;
    let mut player = bastion_core::replay::ReplayPlayer::new(replay, data.config.clone(), data.catalog.clone())?;
    player.verify()?;
    Ok(ticks)
}
