//! Worker efficiency: assigned workers to effective workers.
//!
//! Every output formula in the game multiplies by *effective workers*
//! rather than the raw assignment count. Each extra worker on the same
//! building is worth geometrically less than the previous one, and a
//! milestone multiplier rewards reaching fixed staffing thresholds.
//!
//! With the passive baseline enabled an idle building still counts as one
//! fully efficient worker, so it never produces exactly zero.

use serde::{Deserialize, Serialize};

use crate::config::EfficiencyConfig;

/// Breakdown of an efficiency calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyResult {
    /// `total_efficiency * milestone_bonus`.
    pub effective_workers: f64,
    /// Summed contributions, passive baseline included.
    pub total_efficiency: f64,
    /// Multiplier of the highest milestone reached (1 when none).
    pub milestone_bonus: f64,
    /// Mean contribution of the assigned workers (0 when none).
    pub average_efficiency: f64,
}

impl EfficiencyResult {
    /// Result for a building that contributes nothing.
    pub const ZERO: Self = Self {
        effective_workers: 0.0,
        total_efficiency: 0.0,
        milestone_bonus: 1.0,
        average_efficiency: 0.0,
    };
}

/// Convert an assignment count into effective workers.
///
/// Worker `k` (1-based) contributes `decay^(k-1)`. Pure.
#[must_use]
pub fn calculate_efficiency(
    assigned: u32,
    include_passive_baseline: bool,
    config: &EfficiencyConfig,
) -> EfficiencyResult {
    if assigned == 0 && !include_passive_baseline {
        return EfficiencyResult::ZERO;
    }

    let mut worker_sum = 0.0;
    let mut contribution = 1.0;
    for _ in 0..assigned {
        worker_sum += contribution;
        contribution *= config.decay;
    }

    let baseline = if include_passive_baseline { 1.0 } else { 0.0 };
    let total_efficiency = baseline + worker_sum;
    let milestone_bonus = milestone_bonus(assigned, config);
    let average_efficiency = if assigned == 0 {
        0.0
    } else {
        worker_sum / f64::from(assigned)
    };

    EfficiencyResult {
        effective_workers: total_efficiency * milestone_bonus,
        total_efficiency,
        milestone_bonus,
        average_efficiency,
    }
}

/// Multiplier of the highest milestone `assigned` has reached.
#[must_use]
pub fn milestone_bonus(assigned: u32, config: &EfficiencyConfig) -> f64 {
    config
        .milestones
        .iter()
        .filter(|m| assigned >= m.workers)
        .map(|m| m.bonus)
        .fold(1.0, f64::max)
}

/// Shorthand for [`calculate_efficiency`] returning only effective workers.
#[must_use]
pub fn effective_workers(assigned: u32, config: &EfficiencyConfig) -> f64 {
    calculate_efficiency(assigned, config.include_passive_baseline, config).effective_workers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_passive_baseline() {
        let config = EfficiencyConfig::default();
        let idle = calculate_efficiency(0, true, &config);
        assert!(approx(idle.effective_workers, 1.0));
        assert_eq!(idle.average_efficiency, 0.0);

        let one = calculate_efficiency(1, true, &config);
        assert!(approx(one.effective_workers, 2.0));
        assert!(approx(one.average_efficiency, 1.0));
    }

    #[test]
    fn test_no_baseline_idle_is_zero() {
        let config = EfficiencyConfig::default();
        assert_eq!(calculate_efficiency(0, false, &config), EfficiencyResult::ZERO);
        assert!(approx(calculate_efficiency(1, false, &config).effective_workers, 1.0));
    }

    #[test]
    fn test_second_worker_decays() {
        let config = EfficiencyConfig::default();
        let two = calculate_efficiency(2, false, &config);
        assert!(approx(two.total_efficiency, 1.9));
        assert!(approx(two.average_efficiency, 0.95));
    }

    #[test]
    fn test_milestones_use_highest_reached() {
        let config = EfficiencyConfig::default();
        assert_eq!(milestone_bonus(4, &config), 1.0);
        assert_eq!(milestone_bonus(5, &config), 1.10);
        assert_eq!(milestone_bonus(12, &config), 1.25);
        assert_eq!(milestone_bonus(40, &config), 1.50);

        let five = calculate_efficiency(5, true, &config);
        assert!(approx(five.effective_workers, five.total_efficiency * 1.10));
    }

    #[test]
    fn test_monotonic_in_workers() {
        let config = EfficiencyConfig::default();
        let mut previous = 0.0;
        for n in 0..60 {
            let current = effective_workers(n, &config);
            assert!(current > previous, "not increasing at {n}");
            previous = current;
        }
    }

    #[test]
    fn test_marginal_returns_shrink_between_milestones() {
        let config = EfficiencyConfig::default();
        let thresholds: Vec<u32> = config.milestones.iter().map(|m| m.workers).collect();
        for n in 1..40 {
            if thresholds.contains(&(n + 1)) || thresholds.contains(&(n + 2)) {
                continue;
            }
            let d1 = effective_workers(n + 1, &config) - effective_workers(n, &config);
            let d2 = effective_workers(n + 2, &config) - effective_workers(n + 1, &config);
            assert!(d2 <= d1 + 1e-12, "marginal return grew at {n}");
        }
    }
}
