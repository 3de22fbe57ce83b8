//! Prestige upgrade definitions.

use serde::{Deserialize, Serialize};

/// How values of one effect kind combine across upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stacking {
    /// Values multiply; neutral value 1.
    Multiplicative,
    /// Values add; neutral value 0.
    Additive,
}

/// The stat a prestige upgrade improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeEffectKind {
    /// Multiplies all scrap production.
    ProductionMultiplier,
    /// Multiplies tap damage.
    TapPower,
    /// Multiplies automatic damage.
    AutoDamage,
    /// Multiplies wave rewards.
    ScrapGain,
    /// Multiplies blueprints earned on prestige.
    BlueprintGain,
    /// Multiplies burst damage.
    BurstDamage,
    /// Adds to the burst chance.
    BurstChance,
    /// Adds to the offline efficiency.
    OfflineEfficiency,
    /// Adds scrap after every prestige reset.
    StartingScrap,
}

impl UpgradeEffectKind {
    /// How this kind stacks.
    #[must_use]
    pub const fn stacking(self) -> Stacking {
        match self {
            Self::ProductionMultiplier
            | Self::TapPower
            | Self::AutoDamage
            | Self::ScrapGain
            | Self::BlueprintGain
            | Self::BurstDamage => Stacking::Multiplicative,
            Self::BurstChance | Self::OfflineEfficiency | Self::StartingScrap => {
                Stacking::Additive
            }
        }
    }

    /// Value of an unowned upgrade of this kind.
    #[must_use]
    pub const fn neutral(self) -> f64 {
        match self.stacking() {
            Stacking::Multiplicative => 1.0,
            Stacking::Additive => 0.0,
        }
    }
}

/// Data-driven prestige upgrade.
///
/// Cost at level `n` is `base_cost * cost_multiplier^n`; effect at level
/// `n >= 1` is `base_effect + per_level * n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeUpgradeDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stat improved.
    pub effect: UpgradeEffectKind,
    /// Blueprint cost of the first level.
    pub base_cost: u64,
    /// Cost growth per owned level.
    pub cost_multiplier: f64,
    /// Effect offset.
    pub base_effect: f64,
    /// Effect gained per level.
    pub per_level: f64,
    /// Highest purchasable level.
    pub max_level: u32,
}

impl PrestigeUpgradeDefinition {
    /// Collect validation problems for this definition.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_level == 0 {
            errors.push(format!("upgrade '{}' max_level must be positive", self.id));
        }
        if self.cost_multiplier <= 1.0
            || (self.base_cost as f64) * (self.cost_multiplier - 1.0) < 1.0
        {
            errors.push(format!(
                "upgrade '{}' cost must grow by at least one blueprint per level",
                self.id
            ));
        }
        if self.per_level < 0.0 {
            errors.push(format!("upgrade '{}' per_level must not be negative", self.id));
        }
        if self.base_effect + self.per_level < self.effect.neutral() {
            errors.push(format!(
                "upgrade '{}' level 1 is weaker than owning nothing",
                self.id
            ));
        }
        errors
    }
}
