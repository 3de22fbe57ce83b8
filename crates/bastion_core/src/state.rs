//! Player state and the serializable game snapshot.
//!
//! The snapshot is the only thing that crosses the persistence boundary.
//! Every field has a serde default, so snapshots written by older builds
//! load with new fields filled in; [`GameSnapshot::migrate`] then
//! reconciles building entries with the current catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::boosts::BoostInstance;
use crate::builders::{repair_assignments, BuilderCounts};
use crate::buildings::BuildingInstance;
use crate::combat::CombatState;
use crate::config::BalanceConfig;
use crate::data::Catalog;
use crate::error::{GameError, Result};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Persistent player progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    /// Soft currency.
    pub scrap: u64,
    /// Prestige currency.
    pub blueprints: u64,
    /// Blueprints earned over all resets.
    pub total_blueprints_earned: u64,
    /// Number of prestige resets.
    pub prestige_count: u32,
    /// Highest wave ever reached.
    pub highest_wave: u32,
    /// Wave being fought.
    pub current_wave: u32,
    /// Builder ledger.
    pub builders: BuilderCounts,
    /// Owned prestige upgrade levels.
    pub prestige_upgrades: BTreeMap<String, u32>,
    /// Active timed boosts.
    pub active_boosts: Vec<BoostInstance>,
    /// Builders bought with blueprints.
    pub builders_purchased: u32,
    /// Boosts granted so far, used for boost ids.
    pub boosts_granted: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(&BalanceConfig::default())
    }
}

impl PlayerState {
    /// Fresh player at wave 1.
    #[must_use]
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            scrap: 0,
            blueprints: 0,
            total_blueprints_earned: 0,
            prestige_count: 0,
            highest_wave: 1,
            current_wave: 1,
            builders: BuilderCounts::new(config.builders.starting_builders, config.builders.max_builders),
            prestige_upgrades: BTreeMap::new(),
            active_boosts: Vec::new(),
            builders_purchased: 0,
            boosts_granted: 0,
        }
    }

    /// Add scrap, saturating.
    pub fn add_scrap(&mut self, amount: u64) {
        self.scrap = self.scrap.saturating_add(amount);
    }

    /// Add blueprints, saturating, counting them towards the lifetime total.
    pub fn add_blueprints(&mut self, amount: u64) {
        self.blueprints = self.blueprints.saturating_add(amount);
        self.total_blueprints_earned = self.total_blueprints_earned.saturating_add(amount);
    }
}

/// Complete serializable game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    /// Format version.
    pub version: u32,
    /// Seed of the simulation RNG.
    pub seed: u64,
    /// Position of the RNG stream, in 32-bit words.
    pub rng_word_pos: u64,
    /// Ticks processed.
    pub tick: u64,
    /// Simulated milliseconds processed.
    pub elapsed_ms: u64,
    /// Ticking suspended.
    pub paused: bool,
    /// Player progress.
    pub player: PlayerState,
    /// Buildings by id.
    pub buildings: BTreeMap<String, BuildingInstance>,
    /// Combat state.
    pub combat: CombatState,
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            seed: 0,
            rng_word_pos: 0,
            tick: 0,
            elapsed_ms: 0,
            paused: false,
            player: PlayerState::default(),
            buildings: BTreeMap::new(),
            combat: CombatState::default(),
        }
    }
}

/// Changes made while reconciling a snapshot with the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Snapshot version before migration.
    pub from_version: u32,
    /// `(old_id, new_id)` pairs resolved through aliases.
    pub renamed: Vec<(String, String)>,
    /// Building ids with no catalog entry.
    pub dropped: Vec<String>,
    /// Catalog buildings missing from the snapshot.
    pub added: Vec<String>,
    /// Builders taken off buildings to restore the ledger.
    pub builders_released: u32,
}

impl MigrationReport {
    /// Check whether migration changed anything structural.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.renamed.is_empty() && self.dropped.is_empty() && self.added.is_empty() && self.builders_released == 0
    }
}

impl GameSnapshot {
    /// Fresh snapshot with every catalog building at wave 1.
    ///
    /// Combat starts inactive; the game spawns the first enemy.
    #[must_use]
    pub fn new(catalog: &Catalog, config: &BalanceConfig, seed: u64) -> Self {
        let player = PlayerState::new(config);
        let buildings = catalog
            .buildings()
            .map(|def| (def.id.clone(), BuildingInstance::new(def, player.current_wave)))
            .collect();
        Self {
            seed,
            player,
            buildings,
            combat: CombatState::new(&config.combat),
            ..Self::default()
        }
    }

    /// Serialize to bincode bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::SerializeError(e.to_string()))
    }

    /// Deserialize from bincode bytes.
    ///
    /// Bincode is positional, so only snapshots from this build load this
    /// way; use RON for long-lived saves.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::DeserializeError(e.to_string()))
    }

    /// Render as pretty RON.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::SerializeError(e.to_string()))
    }

    /// Parse RON; missing fields take their defaults.
    pub fn from_ron(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DeserializeError(e.to_string()))
    }

    /// Reconcile the snapshot with the catalog and configuration.
    ///
    /// Aliased ids are renamed, unknown buildings dropped, missing ones
    /// added, numeric fields clamped into range and the builder ledger
    /// rebuilt. Idempotent.
    pub fn migrate(&mut self, catalog: &Catalog, config: &BalanceConfig) -> MigrationReport {
        let mut report = MigrationReport {
            from_version: self.version,
            ..MigrationReport::default()
        };

        let player = &mut self.player;
        player.current_wave = player.current_wave.max(1);
        player.highest_wave = player.highest_wave.max(player.current_wave);
        player.builders.max_builders = config.builders.max_builders;
        player.active_boosts.retain(|b| !b.is_expired() && b.multiplier.is_finite() && b.multiplier > 0.0);
        let wave = player.current_wave;

        let old = std::mem::take(&mut self.buildings);
        for (key, mut instance) in old {
            let lookup = if instance.type_id.is_empty() { key.as_str() } else { instance.type_id.as_str() };
            let Some(canonical) = catalog.resolve_building_id(lookup).map(str::to_string) else {
                tracing::warn!(building = %key, "Dropping building missing from catalog");
                report.dropped.push(key);
                continue;
            };
            if self.buildings.contains_key(&canonical) {
                tracing::warn!(building = %key, canonical = %canonical, "Dropping duplicate building entry");
                report.dropped.push(key);
                continue;
            }
            if canonical != key {
                report.renamed.push((key, canonical.clone()));
            }
            instance.id = canonical.clone();
            instance.type_id = canonical.clone();
            self.buildings.insert(canonical, instance);
        }

        for definition in catalog.buildings() {
            if !self.buildings.contains_key(&definition.id) {
                self.buildings
                    .insert(definition.id.clone(), BuildingInstance::new(definition, wave));
                report.added.push(definition.id.clone());
            }
        }

        for instance in self.buildings.values_mut() {
            let Some(definition) = catalog.building(&instance.type_id) else {
                continue;
            };
            instance.level = instance.level.max(1);
            instance.evolution_tier = instance.evolution_tier.clamp(1, definition.max_tier());
            if !instance.production_progress.is_finite() || instance.production_progress < 0.0 {
                instance.production_progress = 0.0;
            }
            if !instance.effect_timer.is_finite() || instance.effect_timer < 0.0 {
                instance.effect_timer = 0.0;
            }
            if instance.upgrade_progress.is_some_and(|p| !p.is_finite() || p < 0.0) {
                instance.upgrade_progress = Some(0.0);
            }
            instance.sync_with_wave(definition, wave);
        }

        report.builders_released = repair_assignments(&mut self.player.builders, &mut self.buildings, catalog);

        let combat = &mut self.combat;
        combat.wave_timer_max = combat.wave_timer_max.clamp(0.0, config.waves.timer_ceiling);
        combat.wave_timer = combat.wave_timer.clamp(0.0, combat.wave_timer_max);
        if combat.current_enemy.as_ref().is_some_and(|e| e.wave != wave) {
            combat.end_wave();
        }

        self.version = SNAPSHOT_VERSION;
        if !report.is_clean() {
            tracing::info!(
                from_version = report.from_version,
                renamed = report.renamed.len(),
                dropped = report.dropped.len(),
                added = report.added.len(),
                builders_released = report.builders_released,
                "Migrated snapshot"
            );
        }
        report
    }
}
