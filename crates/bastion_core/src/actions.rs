//! Serializable player actions and grants.
//!
//! Every entry point of [`Game`](crate::simulation::Game) that a player or
//! the purchase layer can trigger has a [`PlayerAction`] variant, so scripted
//! scenarios and replays can drive a game from data alone.

use serde::{Deserialize, Serialize};

use crate::boosts::BoostScope;

/// One input to the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Put an idle builder on a building.
    AssignBuilder {
        /// Building id.
        building: String,
    },
    /// Take a builder off a building.
    UnassignBuilder {
        /// Building id.
        building: String,
    },
    /// Move a builder between buildings.
    ReassignBuilder {
        /// Source building id.
        from: String,
        /// Target building id.
        to: String,
    },
    /// Pay scrap to start a building upgrade.
    UpgradeBuilding {
        /// Building id.
        building: String,
    },
    /// Tap the current enemy.
    Tap {
        /// The tap hit a weak point.
        #[serde(default)]
        weak_point: bool,
    },
    /// Buy a prestige upgrade level.
    PurchaseUpgrade {
        /// Upgrade id.
        upgrade: String,
    },
    /// Reset for blueprints.
    ExecutePrestige,
    /// Buy a builder with blueprints.
    PurchaseBuilder,
    /// Purchase grant: add builders.
    GrantBuilders {
        /// Builders to add.
        count: u32,
    },
    /// Purchase grant: timed multiplier.
    ApplyBoost {
        /// Multiplier.
        multiplier: f64,
        /// Duration.
        duration_ms: i64,
        /// Systems affected.
        #[serde(default)]
        scope: BoostScope,
    },
    /// Suspend ticking.
    Pause,
    /// Resume ticking.
    Resume,
}

impl PlayerAction {
    /// Short name for logs and reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AssignBuilder { .. } => "assign_builder",
            Self::UnassignBuilder { .. } => "unassign_builder",
            Self::ReassignBuilder { .. } => "reassign_builder",
            Self::UpgradeBuilding { .. } => "upgrade_building",
            Self::Tap { .. } => "tap",
            Self::PurchaseUpgrade { .. } => "purchase_upgrade",
            Self::ExecutePrestige => "execute_prestige",
            Self::PurchaseBuilder => "purchase_builder",
            Self::GrantBuilders { .. } => "grant_builders",
            Self::ApplyBoost { .. } => "apply_boost",
            Self::Pause => "pause",
            Self::Resume => "resume",
        }
    }
}
