//! Static game data: buildings, enemies, synergies and prestige upgrades.
//!
//! This module contains pure data structures designed to be deserialized
//! from RON, plus the indexed [`Catalog`] built from them once at startup.
//!
//! **Note:** This module does no file IO. Callers read files and hand the
//! text to [`Catalog::from_ron_str`].

mod building_data;
mod catalog;
mod enemy_data;
mod synergy_data;
mod upgrade_data;

pub use building_data::{BuildingRole, BuildingTier, EvolvableBuildingDefinition, SpecialEffectKind};
pub use catalog::{Catalog, CatalogData};
pub use enemy_data::{EnemyTierDefinition, FinalBossDefinition};
pub use synergy_data::{SynergyDefinition, SynergyEffect, SynergyRule, WorkerRequirement};
pub use upgrade_data::{PrestigeUpgradeDefinition, Stacking, UpgradeEffectKind};
