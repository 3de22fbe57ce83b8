//! Enemy tier and final boss definitions.

use serde::{Deserialize, Serialize};

/// Enemy tier covering a contiguous wave range.
///
/// Stats scale geometrically from the tier's first wave:
/// `base * multiplier^(wave - min_wave)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTierDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// First wave of this tier.
    pub min_wave: u32,
    /// Last wave of this tier; `None` for the open-ended final tier.
    #[serde(default)]
    pub max_wave: Option<u32>,
    /// Health at `min_wave`.
    pub base_health: f64,
    /// Health growth per wave.
    pub health_multiplier_per_wave: f64,
    /// Reward at `min_wave`.
    pub base_reward: f64,
    /// Reward growth per wave.
    pub reward_multiplier_per_wave: f64,
}

impl EnemyTierDefinition {
    /// Check whether the tier covers `wave`.
    #[must_use]
    pub fn contains(&self, wave: u32) -> bool {
        wave >= self.min_wave && self.max_wave.map_or(true, |max| wave <= max)
    }
}

/// A named boss that replaces normal spawning on one specific wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalBossDefinition {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The wave this boss owns.
    pub wave: u32,
    /// Fixed health.
    pub health: f64,
    /// Fixed scrap reward.
    pub reward: f64,
    /// Bespoke wave timer in seconds.
    pub timer_seconds: f64,
    /// Blueprints dropped on defeat, guaranteed.
    pub drop_blueprints: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_contains() {
        let mut tier = EnemyTierDefinition {
            id: "drones".into(),
            name: "Scrap Drone".into(),
            min_wave: 1,
            max_wave: Some(9),
            base_health: 100.0,
            health_multiplier_per_wave: 1.25,
            base_reward: 10.0,
            reward_multiplier_per_wave: 1.15,
        };
        assert!(tier.contains(1));
        assert!(tier.contains(9));
        assert!(!tier.contains(10));
        assert!(!tier.contains(0));

        tier.max_wave = None;
        assert!(tier.contains(10_000));
    }
}
