//! # Bastion Core
//!
//! Deterministic simulation core for Scrap Bastion, an idle tower-defense
//! game: buildings produce scrap, builders staff them, enemies arrive in
//! timed waves and prestige resets trade progress for blueprints.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO apart from explicit save/load helpers
//! - No system randomness (one seeded `ChaCha8Rng` per game)
//!
//! This separation enables:
//! - Headless balance simulation
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Buildings, enemies, synergies and upgrades
//! - [`config`] - Balance tunables
//! - [`efficiency`] - Worker efficiency curve
//! - [`buildings`] / [`builders`] - Building instances and the builder pool
//! - [`production`] - Scrap production and offline progress
//! - [`waves`] / [`combat`] - Enemy spawning and damage
//! - [`special_effects`] / [`synergy`] - Building effects and combos
//! - [`prestige`] / [`boosts`] - Meta progression and timed multipliers
//! - [`simulation`] - The [`Game`](simulation::Game) aggregate and tick loop
//! - [`state`] / [`replay`] - Snapshots, migration and replays

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod boosts;
pub mod builders;
pub mod buildings;
pub mod combat;
pub mod config;
pub mod data;
pub mod efficiency;
pub mod error;
pub mod events;
pub mod math;
pub mod prestige;
pub mod production;
pub mod replay;
pub mod simulation;
pub mod special_effects;
pub mod state;
pub mod synergy;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::PlayerAction;
    pub use crate::boosts::{BoostInstance, BoostScope};
    pub use crate::builders::{BuilderCounts, BuilderPool};
    pub use crate::buildings::BuildingInstance;
    pub use crate::combat::{CombatOutcome, CombatState, TapResult};
    pub use crate::config::BalanceConfig;
    pub use crate::data::{BuildingRole, Catalog, CatalogData, SpecialEffectKind};
    pub use crate::error::{ActionError, GameError, Result};
    pub use crate::events::{EventSink, GainSource, GameEvent, NullSink, Resource};
    pub use crate::replay::{Replay, ReplayPlayer, ReplayRecorder};
    pub use crate::simulation::{Game, GameView, TickReport};
    pub use crate::state::{GameSnapshot, MigrationReport, PlayerState};
    pub use crate::waves::EnemyInstance;
}
