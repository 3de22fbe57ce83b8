//! Synergy definitions: worker-allocation requirements mapped to bonuses.

use serde::{Deserialize, Serialize};

/// A building that must be staffed with at least `min_workers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequirement {
    /// Building id.
    pub building: String,
    /// Minimum assigned builders.
    pub min_workers: u32,
}

impl WorkerRequirement {
    /// Create a requirement.
    #[must_use]
    pub fn new(building: impl Into<String>, min_workers: u32) -> Self {
        Self {
            building: building.into(),
            min_workers,
        }
    }
}

/// How a synergy decides whether it is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynergyRule {
    /// Every listed requirement holds.
    AllOf(Vec<WorkerRequirement>),
    /// The anchor holds and at least `others` other buildings each have
    /// `min_workers` or more.
    AnchorWithOthers {
        /// The building the synergy is built around.
        anchor: WorkerRequirement,
        /// Number of other qualifying buildings needed.
        others: u32,
        /// Minimum workers for another building to qualify.
        min_workers: u32,
    },
}

/// Bonus granted while a synergy is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SynergyEffect {
    /// Additive percentage on wave-clear scrap.
    KillScrap(f64),
    /// Additive into the effective-worker multiplier.
    Efficiency(f64),
    /// Additive into the production multiplier.
    Production(f64),
    /// Additive into the damage multiplier.
    Damage(f64),
    /// Multiplicative upgrade speed factor.
    UpgradeSpeed(f64),
}

/// Data-driven synergy definition.
///
/// # Example RON
///
/// ```ron
/// SynergyDefinition(
///     id: "assembly_line",
///     name: "Assembly Line",
///     rule: AllOf([(building: "scrap_collector", min_workers: 3), (building: "foundry", min_workers: 3)]),
///     effect: Production(0.15),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Activation rule.
    pub rule: SynergyRule,
    /// Bonus while active.
    pub effect: SynergyEffect,
}

impl SynergyDefinition {
    /// Building ids referenced by the rule.
    #[must_use]
    pub fn referenced_buildings(&self) -> Vec<&str> {
        match &self.rule {
            SynergyRule::AllOf(requirements) => {
                requirements.iter().map(|r| r.building.as_str()).collect()
            }
            SynergyRule::AnchorWithOthers { anchor, .. } => vec![anchor.building.as_str()],
        }
    }
}
