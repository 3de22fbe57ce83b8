//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

/// What a building contributes to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingRole {
    /// Produces scrap every tick.
    Production,
    /// Deals automatic damage to the current enemy.
    Combat,
    /// Provides a global bonus or special effect.
    Utility,
}

/// Special effect a building tier can carry.
///
/// Each kind is owned by exactly one building type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpecialEffectKind {
    /// Periodically finds bonus scrap.
    ScrapFind,
    /// Adds to the global burst chance.
    BurstBoost,
    /// Weak-point hits may deal a flat large multiplier.
    CriticalWeakness,
    /// Waves may start with bonus seconds on the timer.
    WaveExtend,
}

impl SpecialEffectKind {
    /// All effect kinds in a stable order.
    pub const ALL: [Self; 4] = [
        Self::ScrapFind,
        Self::BurstBoost,
        Self::CriticalWeakness,
        Self::WaveExtend,
    ];
}

/// One evolution tier of a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingTier {
    /// 1-based tier number.
    pub tier: u32,
    /// Display name while at this tier.
    pub name: String,
    /// Output per effective worker per second (scrap, damage or percentage).
    pub base_production: f64,
    /// Upgrade cost at level 1 while at this tier.
    pub base_cost: u64,
    /// Wave at which this tier becomes available.
    pub unlock_wave: u32,
    /// Special effect granted while at this tier.
    #[serde(default)]
    pub special_effect: Option<SpecialEffectKind>,
}

/// Data-driven definition of a building that evolves through tiers.
///
/// # Example RON
///
/// ```ron
/// EvolvableBuildingDefinition(
///     id: "turret",
///     name: "Turret",
///     role: Combat,
///     cost_multiplier: 1.5,
///     max_builders: 15,
///     tiers: [
///         (tier: 1, name: "Scrap Turret", base_production: 2.0, base_cost: 50, unlock_wave: 1),
///         (tier: 2, name: "Autocannon", base_production: 6.0, base_cost: 500, unlock_wave: 20),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvableBuildingDefinition {
    /// Unique string identifier for this building type.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the building contributes.
    pub role: BuildingRole,
    /// Upgrade cost growth per level.
    pub cost_multiplier: f64,
    /// Maximum builders that can be assigned.
    pub max_builders: u32,
    /// Evolution tiers sorted by tier number.
    pub tiers: Vec<BuildingTier>,
    /// Static-effect building that never takes workers.
    #[serde(default)]
    pub no_workers: bool,
    /// Legacy ids that older snapshots may use for this building.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EvolvableBuildingDefinition {
    /// Get a tier by number.
    #[must_use]
    pub fn tier(&self, tier: u32) -> Option<&BuildingTier> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// The first tier.
    #[must_use]
    pub fn base_tier(&self) -> Option<&BuildingTier> {
        self.tiers.first()
    }

    /// Highest tier number.
    #[must_use]
    pub fn max_tier(&self) -> u32 {
        self.tiers.last().map_or(1, |t| t.tier)
    }

    /// Wave at which the building itself unlocks.
    #[must_use]
    pub fn unlock_wave(&self) -> u32 {
        self.base_tier().map_or(u32::MAX, |t| t.unlock_wave)
    }

    /// Highest tier whose unlock wave has been reached, or `None` while locked.
    #[must_use]
    pub fn tier_for_wave(&self, wave: u32) -> Option<u32> {
        self.tiers
            .iter()
            .filter(|t| t.unlock_wave <= wave)
            .map(|t| t.tier)
            .max()
    }

    /// Special effect at the given tier, if any.
    #[must_use]
    pub fn special_effect_at(&self, tier: u32) -> Option<SpecialEffectKind> {
        self.tier(tier).and_then(|t| t.special_effect)
    }

    /// Check whether any tier carries the given effect.
    #[must_use]
    pub fn owns_effect(&self, kind: SpecialEffectKind) -> bool {
        self.tiers.iter().any(|t| t.special_effect == Some(kind))
    }

    /// Check whether `id` names this building directly or through an alias.
    #[must_use]
    pub fn answers_to(&self, id: &str) -> bool {
        self.id == id || self.aliases.iter().any(|a| a == id)
    }

    /// Collect validation problems for this definition.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push("building with empty id".to_string());
        }
        if self.tiers.is_empty() {
            errors.push(format!("building '{}' has no tiers", self.id));
        }
        if self.cost_multiplier <= 1.0 {
            errors.push(format!(
                "building '{}' cost_multiplier must exceed 1",
                self.id
            ));
        }
        if self.no_workers && self.max_builders != 0 {
            errors.push(format!(
                "building '{}' takes no workers but has max_builders {}",
                self.id, self.max_builders
            ));
        }

        let mut last_wave = 0;
        for (index, tier) in self.tiers.iter().enumerate() {
            if tier.tier as usize != index + 1 {
                errors.push(format!(
                    "building '{}' tiers must be numbered 1..n in order",
                    self.id
                ));
            }
            if tier.unlock_wave < last_wave {
                errors.push(format!(
                    "building '{}' tier {} unlocks before the previous tier",
                    self.id, tier.tier
                ));
            }
            if tier.base_production < 0.0 {
                errors.push(format!(
                    "building '{}' tier {} has negative production",
                    self.id, tier.tier
                ));
            }
            // Floors of a geometric series only stay strictly increasing when
            // each step adds at least one whole unit.
            if (tier.base_cost as f64) * (self.cost_multiplier - 1.0) < 1.0 {
                errors.push(format!(
                    "building '{}' tier {} base_cost too small for cost_multiplier",
                    self.id, tier.tier
                ));
            }
            last_wave = tier.unlock_wave;
        }

        errors
    }
}
