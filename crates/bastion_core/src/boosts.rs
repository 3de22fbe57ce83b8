//! Timed boost multipliers.
//!
//! Boosts come from purchases and lucky drops. Every active boost whose
//! scope covers a system multiplies into that system's boost factor, and
//! the product is capped so stacking can never run away.

use serde::{Deserialize, Serialize};

/// Which systems a boost affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoostScope {
    /// Production and combat.
    #[default]
    All,
    /// Scrap production only.
    Production,
    /// Damage and wave rewards only.
    Combat,
}

impl BoostScope {
    /// Check whether a boost of this scope applies to `target`.
    ///
    /// An `All` target only counts `All` boosts.
    #[must_use]
    pub fn covers(self, target: Self) -> bool {
        self == Self::All || self == target
    }
}

/// An active timed multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostInstance {
    /// Unique id within the save.
    pub id: String,
    /// Time left; the boost expires at or below zero.
    pub remaining_duration_ms: i64,
    /// Multiplier while active.
    pub multiplier: f64,
    /// Systems affected.
    #[serde(default)]
    pub scope: BoostScope,
}

impl BoostInstance {
    /// Check whether the boost has run out.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_duration_ms <= 0
    }
}

/// Product of all live boosts covering `scope`, capped at `cap`.
#[must_use]
pub fn combined_multiplier(boosts: &[BoostInstance], scope: BoostScope, cap: f64) -> f64 {
    let product: f64 = boosts
        .iter()
        .filter(|b| !b.is_expired() && b.scope.covers(scope))
        .map(|b| b.multiplier)
        .product();
    product.min(cap.max(1.0))
}

/// Count boosts down by `delta_ms`, returning the ones that expired.
pub fn decay_boosts(boosts: &mut Vec<BoostInstance>, delta_ms: i64) -> Vec<BoostInstance> {
    if delta_ms <= 0 {
        return Vec::new();
    }
    for boost in boosts.iter_mut() {
        boost.remaining_duration_ms = boost.remaining_duration_ms.saturating_sub(delta_ms);
    }
    let (expired, live): (Vec<_>, Vec<_>) = boosts.drain(..).partition(BoostInstance::is_expired);
    *boosts = live;
    expired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boost(id: &str, multiplier: f64, remaining_duration_ms: i64, scope: BoostScope) -> BoostInstance {
        BoostInstance {
            id: id.to_string(),
            remaining_duration_ms,
            multiplier,
            scope,
        }
    }

    #[test]
    fn test_no_boosts_is_neutral() {
        assert_eq!(combined_multiplier(&[], BoostScope::All, 10.0), 1.0);
    }

    #[test]
    fn test_boosts_multiply_and_cap() {
        let boosts = vec![
            boost("a", 2.0, 1000, BoostScope::All),
            boost("b", 3.0, 1000, BoostScope::All),
        ];
        assert_eq!(combined_multiplier(&boosts, BoostScope::All, 10.0), 6.0);

        let many: Vec<_> = (0..8)
            .map(|i| boost(&format!("b{i}"), 2.0, 1000, BoostScope::All))
            .collect();
        assert_eq!(combined_multiplier(&many, BoostScope::All, 10.0), 10.0);
    }

    #[test]
    fn test_scope_filtering() {
        let boosts = vec![
            boost("prod", 2.0, 1000, BoostScope::Production),
            boost("fight", 3.0, 1000, BoostScope::Combat),
        ];
        assert_eq!(combined_multiplier(&boosts, BoostScope::Production, 10.0), 2.0);
        assert_eq!(combined_multiplier(&boosts, BoostScope::Combat, 10.0), 3.0);
    }

    #[test]
    fn test_all_target_ignores_single_system_boosts() {
        let boosts = vec![
            boost("prod", 2.0, 1000, BoostScope::Production),
            boost("fight", 3.0, 1000, BoostScope::Combat),
        ];
        assert_eq!(combined_multiplier(&boosts, BoostScope::All, 10.0), 1.0);

        let mut with_global = boosts;
        with_global.push(boost("global", 1.5, 1000, BoostScope::All));
        assert_eq!(combined_multiplier(&with_global, BoostScope::All, 10.0), 1.5);
        assert_eq!(combined_multiplier(&with_global, BoostScope::Production, 10.0), 3.0);
        assert_eq!(combined_multiplier(&with_global, BoostScope::Combat, 10.0), 4.5);
    }

    #[test]
    fn test_decay_removes_expired() {
        let mut boosts = vec![
            boost("short", 2.0, 100, BoostScope::All),
            boost("long", 2.0, 5000, BoostScope::All),
        ];
        let expired = decay_boosts(&mut boosts, 100);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "short");
        assert_eq!(boosts.len(), 1);
        assert_eq!(boosts[0].remaining_duration_ms, 4900);

        assert!(decay_boosts(&mut boosts, -50).is_empty());
        assert_eq!(boosts[0].remaining_duration_ms, 4900);
    }
}
