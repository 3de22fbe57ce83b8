//! Replay system for recording and playing back games.
//!
//! Replays store the initial snapshot, the wall-clock delta of every tick
//! and the stream of player actions issued in between. Because the
//! simulation is deterministic, that is enough to recreate any session and
//! compare its final [`Game::state_hash`].
//!
//! Step `i` of a replay applies every command recorded at step `i`, then
//! ticks with `tick_deltas[i]`. Commands recorded after the last tick are
//! applied at the end.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::actions::PlayerAction;
use crate::config::BalanceConfig;
use crate::data::Catalog;
use crate::error::{GameError, Result};
use crate::events::{EventSink, NullSink};
use crate::simulation::Game;

/// A single command record for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Replay step the command was issued before.
    pub tick: u64,
    /// The action that was issued.
    pub action: PlayerAction,
}

impl ReplayCommand {
    /// Create a new replay command record.
    #[must_use]
    pub const fn new(tick: u64, action: PlayerAction) -> Self {
        Self { tick, action }
    }
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Random seed used for the game.
    pub seed: u64,
    /// Bincode snapshot of the game at the start.
    pub initial_state: Vec<u8>,
    /// Delta of every recorded tick, in milliseconds.
    pub tick_deltas: Vec<i64>,
    /// Stream of commands in step order.
    pub commands: Vec<ReplayCommand>,
    /// Steps recorded.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Create a new replay from a game's current state.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Game) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            seed: initial_state.snapshot().seed,
            initial_state: initial_state.serialize()?,
            tick_deltas: Vec::new(),
            commands: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        })
    }

    /// Record an action issued before the next tick.
    pub fn record_action(&mut self, action: PlayerAction) {
        let tick = self.tick_deltas.len() as u64;
        self.commands.push(ReplayCommand::new(tick, action));
    }

    /// Record one tick.
    pub fn record_tick(&mut self, delta_ms: i64) {
        self.tick_deltas.push(delta_ms);
    }

    /// Finalize the replay with the end state.
    pub fn finalize(&mut self, final_hash: u64) {
        self.final_tick = self.tick_deltas.len() as u64;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::SerializeError(format!("replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization or the version
    /// check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::DeserializeError(format!("replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Rebuild the starting game.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self, config: BalanceConfig, catalog: Catalog) -> Result<Game> {
        Game::deserialize(config, catalog, &self.initial_state)
    }

    /// Commands issued before step `tick`.
    pub fn commands_at_tick(&self, tick: u64) -> impl Iterator<Item = &ReplayCommand> {
        self.commands.iter().filter(move |cmd| cmd.tick == tick)
    }

    /// Total duration of the replay in steps.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Total number of commands in the replay.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Game wrapper that records everything it is fed.
#[derive(Debug)]
pub struct ReplayRecorder {
    game: Game,
    replay: Replay,
}

impl ReplayRecorder {
    /// Start recording from the game's current state.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, game: Game) -> Result<Self> {
        let replay = Replay::new(scenario_id, &game)?;
        Ok(Self { game, replay })
    }

    /// Apply and record an action. Rejected actions are recorded too, since
    /// playback rejects them the same way.
    pub fn apply(&mut self, action: PlayerAction, sink: &mut impl EventSink) -> std::result::Result<(), crate::error::ActionError> {
        let result = self.game.apply_action(&action, sink);
        self.replay.record_action(action);
        result
    }

    /// Tick and record.
    pub fn tick(&mut self, delta_ms: i64, sink: &mut impl EventSink) {
        self.game.tick(delta_ms, sink);
        self.replay.record_tick(delta_ms);
    }

    /// The game being recorded.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Stop recording and return the finished replay with the game.
    #[must_use]
    pub fn finish(self) -> (Replay, Game) {
        let mut replay = self.replay;
        replay.finalize(self.game.state_hash());
        (replay, self.game)
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    /// The replay being played.
    replay: Replay,
    /// Balance used to restore the game.
    config: BalanceConfig,
    /// Catalog used to restore the game.
    catalog: Catalog,
    /// Current game state.
    game: Game,
    /// Current playback step.
    current_tick: u64,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay, config: BalanceConfig, catalog: Catalog) -> Result<Self> {
        let game = replay.restore_initial_state(config.clone(), catalog.clone())?;
        Ok(Self {
            replay,
            config,
            catalog,
            game,
            current_tick: 0,
            paused: false,
        })
    }

    fn apply_commands(&mut self, tick: u64) {
        for cmd in self.replay.commands_at_tick(tick) {
            if let Err(err) = self.game.apply_action(&cmd.action, &mut NullSink) {
                tracing::trace!(tick, action = cmd.action.name(), %err, "Replayed action rejected");
            }
        }
    }

    fn step(&mut self) {
        let index = self.current_tick;
        self.apply_commands(index);
        let delta = usize::try_from(index)
            .ok()
            .and_then(|i| self.replay.tick_deltas.get(i))
            .copied()
            .unwrap_or(0);
        self.game.tick(delta, &mut NullSink);
        self.current_tick += 1;
        if self.current_tick == self.replay.final_tick {
            self.apply_commands(self.current_tick);
        }
    }

    /// Advance the replay by one step.
    ///
    /// Returns true if there are more steps to play.
    pub fn advance(&mut self) -> bool {
        if self.paused || self.current_tick >= self.replay.final_tick {
            return self.current_tick < self.replay.final_tick;
        }
        self.step();
        self.current_tick < self.replay.final_tick
    }

    /// Seek to a specific step by replaying from the start.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.game = self
            .replay
            .restore_initial_state(self.config.clone(), self.catalog.clone())?;
        self.current_tick = 0;
        if self.replay.final_tick == 0 {
            self.apply_commands(0);
        }
        while self.current_tick < target_tick && self.current_tick < self.replay.final_tick {
            self.step();
        }
        Ok(())
    }

    /// Current playback step.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Current game state.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// The replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_tick >= self.replay.final_tick
    }

    /// Play to the end and compare the final hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayDiverged`] on a hash mismatch, or an error
    /// if state restoration fails.
    pub fn verify(&mut self) -> Result<()> {
        self.seek(self.replay.final_tick)?;
        let actual = self.game.state_hash();
        if actual == self.replay.final_hash {
            Ok(())
        } else {
            Err(GameError::ReplayDiverged {
                tick: self.replay.final_tick,
                expected: self.replay.final_hash,
                actual,
            })
        }
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}
