//! Immutable, id-indexed game data tables.
//!
//! [`CatalogData`] is the serializable file shape (plain lists, as written in
//! RON). [`Catalog`] is the validated, indexed form the simulation reads.
//! Lookups are fallible: stale ids simply resolve to `None`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::building_data::{BuildingRole, BuildingTier, EvolvableBuildingDefinition, SpecialEffectKind};
use super::enemy_data::{EnemyTierDefinition, FinalBossDefinition};
use super::synergy_data::{SynergyDefinition, SynergyEffect, SynergyRule, WorkerRequirement};
use super::upgrade_data::{PrestigeUpgradeDefinition, UpgradeEffectKind};
use crate::error::{GameError, Result};

/// Serializable catalog contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    /// Building definitions.
    pub buildings: Vec<EvolvableBuildingDefinition>,
    /// Enemy tiers.
    pub enemy_tiers: Vec<EnemyTierDefinition>,
    /// Named bosses at the end of the wave range.
    pub final_bosses: Vec<FinalBossDefinition>,
    /// Cross-building synergies.
    pub synergies: Vec<SynergyDefinition>,
    /// Prestige upgrades.
    pub upgrades: Vec<PrestigeUpgradeDefinition>,
}

/// Validated game data indexed by id.
///
/// Built once at startup and shared read-only by every system.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buildings: BTreeMap<String, EvolvableBuildingDefinition>,
    enemy_tiers: Vec<EnemyTierDefinition>,
    final_bosses: BTreeMap<u32, FinalBossDefinition>,
    synergies: Vec<SynergyDefinition>,
    upgrades: BTreeMap<String, PrestigeUpgradeDefinition>,
}

impl Catalog {
    /// Validate and index catalog data.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        let mut errors = Vec::new();

        let mut buildings = BTreeMap::new();
        for building in data.buildings {
            errors.extend(building.validation_errors());
            let id = building.id.clone();
            if buildings.insert(id.clone(), building).is_some() {
                errors.push(format!("duplicate building id '{id}'"));
            }
        }

        let mut effect_owner: BTreeMap<SpecialEffectKind, &str> = BTreeMap::new();
        for building in buildings.values() {
            for kind in SpecialEffectKind::ALL {
                if building.owns_effect(kind) {
                    if let Some(owner) = effect_owner.insert(kind, building.id.as_str()) {
                        errors.push(format!(
                            "special effect {kind:?} owned by both '{owner}' and '{}'",
                            building.id
                        ));
                    }
                }
            }
        }

        let mut alias_seen = BTreeSet::new();
        for building in buildings.values() {
            for alias in &building.aliases {
                if buildings.contains_key(alias) || !alias_seen.insert(alias.clone()) {
                    errors.push(format!("alias '{alias}' is ambiguous"));
                }
            }
        }

        let mut enemy_tiers = data.enemy_tiers;
        enemy_tiers.sort_by_key(|t| t.min_wave);
        for tier in &enemy_tiers {
            if tier.base_health <= 0.0 {
                errors.push(format!("enemy tier '{}' needs positive health", tier.id));
            }
            if tier.health_multiplier_per_wave < 1.0 || tier.reward_multiplier_per_wave < 1.0 {
                errors.push(format!(
                    "enemy tier '{}' multipliers must be at least 1",
                    tier.id
                ));
            }
            if tier.max_wave.is_some_and(|max| max < tier.min_wave) {
                errors.push(format!("enemy tier '{}' has an empty wave range", tier.id));
            }
        }
        // Every wave from 1 up must spawn something, or the run stalls.
        match (enemy_tiers.first(), enemy_tiers.last()) {
            (Some(first), Some(last)) => {
                if first.min_wave > 1 {
                    errors.push(format!("enemy tier '{}' must start at wave 1", first.id));
                }
                if last.max_wave.is_some() {
                    errors.push(format!("last enemy tier '{}' must be open-ended", last.id));
                }
            }
            _ => errors.push("catalog needs at least one enemy tier".to_string()),
        }
        for pair in enemy_tiers.windows(2) {
            match pair[0].max_wave {
                Some(max) if max < pair[1].min_wave => {
                    if max.saturating_add(1) != pair[1].min_wave {
                        errors.push(format!(
                            "gap between enemy tiers '{}' and '{}' (waves {}..{})",
                            pair[0].id,
                            pair[1].id,
                            max + 1,
                            pair[1].min_wave - 1
                        ));
                    }
                }
                _ => errors.push(format!(
                    "enemy tiers '{}' and '{}' overlap",
                    pair[0].id, pair[1].id
                )),
            }
        }

        let mut final_bosses = BTreeMap::new();
        for boss in data.final_bosses {
            if boss.health <= 0.0 {
                errors.push(format!("final boss '{}' needs positive health", boss.id));
            }
            let wave = boss.wave;
            if final_bosses.insert(wave, boss).is_some() {
                errors.push(format!("two final bosses on wave {wave}"));
            }
        }

        for synergy in &data.synergies {
            for building in synergy.referenced_buildings() {
                if !buildings.contains_key(building) {
                    errors.push(format!(
                        "synergy '{}' references unknown building '{building}'",
                        synergy.id
                    ));
                }
            }
        }

        let mut upgrades = BTreeMap::new();
        for upgrade in data.upgrades {
            errors.extend(upgrade.validation_errors());
            let id = upgrade.id.clone();
            if upgrades.insert(id.clone(), upgrade).is_some() {
                errors.push(format!("duplicate upgrade id '{id}'"));
            }
        }

        if !errors.is_empty() {
            return Err(GameError::ValidationError { errors });
        }

        Ok(Self {
            buildings,
            enemy_tiers,
            final_bosses,
            synergies: data.synergies,
            upgrades,
        })
    }

    /// Parse and validate a catalog from RON text.
    pub fn from_ron_str(source: &str, source_name: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(source).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Self::from_data(data)
    }

    /// Convert back into the serializable shape.
    #[must_use]
    pub fn to_data(&self) -> CatalogData {
        CatalogData {
            buildings: self.buildings.values().cloned().collect(),
            enemy_tiers: self.enemy_tiers.clone(),
            final_bosses: self.final_bosses.values().cloned().collect(),
            synergies: self.synergies.clone(),
            upgrades: self.upgrades.values().cloned().collect(),
        }
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(&self.to_data(), ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::SerializeError(e.to_string()))
    }

    /// Get a building definition by id.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&EvolvableBuildingDefinition> {
        self.buildings.get(id)
    }

    /// Resolve an id or legacy alias to a canonical building id.
    #[must_use]
    pub fn resolve_building_id(&self, id: &str) -> Option<&str> {
        if let Some((key, _)) = self.buildings.get_key_value(id) {
            return Some(key.as_str());
        }
        self.buildings
            .values()
            .find(|b| b.answers_to(id))
            .map(|b| b.id.as_str())
    }

    /// All building definitions in id order.
    pub fn buildings(&self) -> impl Iterator<Item = &EvolvableBuildingDefinition> {
        self.buildings.values()
    }

    /// Enemy tiers sorted by first wave.
    #[must_use]
    pub fn enemy_tiers(&self) -> &[EnemyTierDefinition] {
        &self.enemy_tiers
    }

    /// Final boss owning `wave`, if any.
    #[must_use]
    pub fn final_boss(&self, wave: u32) -> Option<&FinalBossDefinition> {
        self.final_bosses.get(&wave)
    }

    /// All synergies in definition order.
    #[must_use]
    pub fn synergies(&self) -> &[SynergyDefinition] {
        &self.synergies
    }

    /// Get a prestige upgrade by id.
    #[must_use]
    pub fn upgrade(&self, id: &str) -> Option<&PrestigeUpgradeDefinition> {
        self.upgrades.get(id)
    }

    /// All prestige upgrades in id order.
    pub fn upgrades(&self) -> impl Iterator<Item = &PrestigeUpgradeDefinition> {
        self.upgrades.values()
    }

    /// The standard game content.
    #[must_use]
    pub fn standard() -> Self {
        let data = standard_data();
        // The standard tables are covered by `test_standard_catalog_is_valid`;
        // indexing directly keeps this constructor infallible.
        Self {
            buildings: data
                .buildings
                .into_iter()
                .map(|b| (b.id.clone(), b))
                .collect(),
            enemy_tiers: data.enemy_tiers,
            final_bosses: data.final_bosses.into_iter().map(|b| (b.wave, b)).collect(),
            synergies: data.synergies,
            upgrades: data
                .upgrades
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect(),
        }
    }
}

// ============================================================================
// Standard content
// ============================================================================

fn tier(
    tier: u32,
    name: &str,
    base_production: f64,
    base_cost: u64,
    unlock_wave: u32,
    special_effect: Option<SpecialEffectKind>,
) -> BuildingTier {
    BuildingTier {
        tier,
        name: name.to_string(),
        base_production,
        base_cost,
        unlock_wave,
        special_effect,
    }
}

fn building(
    id: &str,
    name: &str,
    role: BuildingRole,
    cost_multiplier: f64,
    max_builders: u32,
    tiers: Vec<BuildingTier>,
) -> EvolvableBuildingDefinition {
    EvolvableBuildingDefinition {
        id: id.to_string(),
        name: name.to_string(),
        role,
        cost_multiplier,
        max_builders,
        tiers,
        no_workers: false,
        aliases: Vec::new(),
    }
}

fn enemy_tier(
    id: &str,
    name: &str,
    waves: (u32, Option<u32>),
    health: (f64, f64),
    reward: (f64, f64),
) -> EnemyTierDefinition {
    EnemyTierDefinition {
        id: id.to_string(),
        name: name.to_string(),
        min_wave: waves.0,
        max_wave: waves.1,
        base_health: health.0,
        health_multiplier_per_wave: health.1,
        base_reward: reward.0,
        reward_multiplier_per_wave: reward.1,
    }
}

fn final_boss(id: &str, name: &str, wave: u32, health: f64, reward: f64, drop: u64) -> FinalBossDefinition {
    FinalBossDefinition {
        id: id.to_string(),
        name: name.to_string(),
        wave,
        health,
        reward,
        timer_seconds: 90.0,
        drop_blueprints: drop,
    }
}

fn synergy(id: &str, name: &str, rule: SynergyRule, effect: SynergyEffect) -> SynergyDefinition {
    SynergyDefinition {
        id: id.to_string(),
        name: name.to_string(),
        rule,
        effect,
    }
}

fn upgrade(
    id: &str,
    name: &str,
    effect: UpgradeEffectKind,
    cost: (u64, f64),
    effect_curve: (f64, f64),
    max_level: u32,
) -> PrestigeUpgradeDefinition {
    PrestigeUpgradeDefinition {
        id: id.to_string(),
        name: name.to_string(),
        effect,
        base_cost: cost.0,
        cost_multiplier: cost.1,
        base_effect: effect_curve.0,
        per_level: effect_curve.1,
        max_level,
    }
}

fn standard_data() -> CatalogData {
    use BuildingRole::{Combat, Production, Utility};
    use SpecialEffectKind::{BurstBoost, CriticalWeakness, ScrapFind, WaveExtend};
    use UpgradeEffectKind as U;

    let mut scrap_collector = building(
        "scrap_collector",
        "Scrap Collector",
        Production,
        1.5,
        15,
        vec![
            tier(1, "Scrap Collector", 1.0, 10, 1, None),
            tier(2, "Scrap Harvester", 3.0, 100, 15, None),
            tier(3, "Scrap Refinery", 8.0, 1_000, 40, None),
            tier(4, "Matter Reclaimer", 20.0, 10_000, 75, None),
        ],
    );
    scrap_collector.aliases = vec!["collector".to_string()];

    let mut chrono_beacon = building(
        "chrono_beacon",
        "Chrono Beacon",
        Utility,
        1.8,
        0,
        vec![
            tier(1, "Chrono Beacon", 0.0, 1_000, 20, Some(WaveExtend)),
            tier(2, "Stasis Spire", 0.0, 10_000, 60, Some(WaveExtend)),
        ],
    );
    chrono_beacon.no_workers = true;
    chrono_beacon.aliases = vec!["time_beacon".to_string()];

    let buildings = vec![
        building(
            "command_center",
            "Command Center",
            Utility,
            1.6,
            10,
            vec![
                tier(1, "Command Tent", 0.05, 250, 1, None),
                tier(2, "Command Post", 0.08, 2_000, 25, None),
                tier(3, "Command Citadel", 0.12, 20_000, 60, None),
            ],
        ),
        scrap_collector,
        building(
            "salvage_yard",
            "Salvage Yard",
            Production,
            1.55,
            15,
            vec![
                tier(1, "Salvage Yard", 5.0, 150, 5, None),
                tier(2, "Salvage Works", 15.0, 1_500, 30, None),
                tier(3, "Salvage Complex", 40.0, 15_000, 70, None),
            ],
        ),
        building(
            "foundry",
            "Foundry",
            Production,
            1.6,
            20,
            vec![
                tier(1, "Foundry", 20.0, 1_200, 12, None),
                tier(2, "Arc Foundry", 60.0, 12_000, 45, None),
                tier(3, "Fusion Forge", 150.0, 120_000, 90, None),
            ],
        ),
        building(
            "turret",
            "Turret",
            Combat,
            1.5,
            15,
            vec![
                tier(1, "Scrap Turret", 2.0, 50, 1, None),
                tier(2, "Autocannon", 6.0, 500, 20, None),
                tier(3, "Flak Battery", 18.0, 5_000, 50, None),
                tier(4, "Plasma Lance", 50.0, 50_000, 85, None),
            ],
        ),
        building(
            "railgun",
            "Railgun",
            Combat,
            1.65,
            10,
            vec![
                tier(1, "Coil Gun", 15.0, 2_000, 18, None),
                tier(2, "Railgun", 45.0, 20_000, 55, None),
                tier(3, "Mass Driver", 120.0, 200_000, 95, None),
            ],
        ),
        building(
            "salvage_drone_bay",
            "Salvage Drone Bay",
            Utility,
            1.7,
            8,
            vec![
                tier(1, "Drone Hangar", 0.0, 400, 8, None),
                tier(2, "Salvage Drone Bay", 0.0, 4_000, 22, Some(ScrapFind)),
                tier(3, "Drone Carrier", 0.0, 40_000, 65, Some(ScrapFind)),
            ],
        ),
        building(
            "targeting_array",
            "Targeting Array",
            Utility,
            1.7,
            8,
            vec![
                tier(1, "Targeting Array", 0.0, 600, 10, Some(BurstBoost)),
                tier(2, "Fire Control Net", 0.0, 6_000, 35, Some(BurstBoost)),
                tier(3, "Predictive Matrix", 0.0, 60_000, 80, Some(BurstBoost)),
            ],
        ),
        building(
            "weakpoint_scanner",
            "Weakpoint Scanner",
            Utility,
            1.7,
            8,
            vec![
                tier(1, "Weakpoint Scanner", 0.0, 800, 15, Some(CriticalWeakness)),
                tier(2, "Deep Scan Array", 0.0, 8_000, 50, Some(CriticalWeakness)),
            ],
        ),
        chrono_beacon,
    ];

    let enemy_tiers = vec![
        enemy_tier("scrap_drones", "Scrap Drone", (1, Some(9)), (100.0, 1.25), (10.0, 1.15)),
        enemy_tier("rust_crawlers", "Rust Crawler", (10, Some(24)), (1_000.0, 1.2), (60.0, 1.12)),
        enemy_tier("iron_hulks", "Iron Hulk", (25, Some(49)), (15_000.0, 1.15), (400.0, 1.1)),
        enemy_tier("siege_walkers", "Siege Walker", (50, Some(74)), (400_000.0, 1.12), (5_000.0, 1.08)),
        enemy_tier("void_reavers", "Void Reaver", (75, Some(100)), (8_000_000.0, 1.1), (40_000.0, 1.07)),
        enemy_tier("endless_horde", "Endless Horde", (101, None), (1.0e9, 1.08), (300_000.0, 1.05)),
    ];

    let final_bosses = vec![
        final_boss("warlord_kragg", "Warlord Kragg", 98, 5.0e8, 1.0e6, 25),
        final_boss("iron_maw", "The Iron Maw", 99, 1.0e9, 2.0e6, 50),
        final_boss("omega_colossus", "Omega Colossus", 100, 2.0e9, 5.0e6, 100),
    ];

    let synergies = vec![
        synergy(
            "assembly_line",
            "Assembly Line",
            SynergyRule::AllOf(vec![
                WorkerRequirement::new("scrap_collector", 3),
                WorkerRequirement::new("foundry", 3),
            ]),
            SynergyEffect::Production(0.15),
        ),
        synergy(
            "salvage_network",
            "Salvage Network",
            SynergyRule::AllOf(vec![
                WorkerRequirement::new("scrap_collector", 5),
                WorkerRequirement::new("salvage_drone_bay", 2),
            ]),
            SynergyEffect::KillScrap(0.25),
        ),
        synergy(
            "firing_solution",
            "Firing Solution",
            SynergyRule::AllOf(vec![
                WorkerRequirement::new("turret", 3),
                WorkerRequirement::new("targeting_array", 2),
            ]),
            SynergyEffect::Damage(0.20),
        ),
        synergy(
            "crossfire",
            "Crossfire",
            SynergyRule::AllOf(vec![
                WorkerRequirement::new("turret", 5),
                WorkerRequirement::new("railgun", 3),
            ]),
            SynergyEffect::Damage(0.30),
        ),
        synergy(
            "logistics_hub",
            "Logistics Hub",
            SynergyRule::AllOf(vec![
                WorkerRequirement::new("command_center", 3),
                WorkerRequirement::new("foundry", 2),
            ]),
            SynergyEffect::UpgradeSpeed(1.5),
        ),
        synergy(
            "full_mobilization",
            "Full Mobilization",
            SynergyRule::AnchorWithOthers {
                anchor: WorkerRequirement::new("command_center", 5),
                others: 4,
                min_workers: 3,
            },
            SynergyEffect::Efficiency(0.10),
        ),
    ];

    let upgrades = vec![
        upgrade("reinforced_tools", "Reinforced Tools", U::ProductionMultiplier, (5, 1.5), (1.0, 0.10), 50),
        upgrade("heavy_gauntlets", "Heavy Gauntlets", U::TapPower, (5, 1.5), (1.0, 0.15), 50),
        upgrade("overclocked_turrets", "Overclocked Turrets", U::AutoDamage, (8, 1.5), (1.0, 0.15), 50),
        upgrade("salvage_contracts", "Salvage Contracts", U::ScrapGain, (10, 1.6), (1.0, 0.10), 40),
        upgrade("archive_access", "Archive Access", U::BlueprintGain, (25, 2.0), (1.0, 0.10), 20),
        upgrade("shaped_charges", "Shaped Charges", U::BurstDamage, (15, 1.8), (1.0, 0.25), 20),
        upgrade("hair_trigger", "Hair Trigger", U::BurstChance, (15, 1.8), (0.0, 0.02), 10),
        upgrade("night_shift", "Night Shift", U::OfflineEfficiency, (20, 2.0), (0.0, 0.05), 8),
        upgrade("standing_reserve", "Standing Reserve", U::StartingScrap, (3, 1.4), (0.0, 500.0), 25),
    ];

    CatalogData {
        buildings,
        enemy_tiers,
        final_bosses,
        synergies,
        upgrades,
    }
}
