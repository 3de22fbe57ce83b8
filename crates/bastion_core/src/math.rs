//! Numeric helpers shared by the balance formulas.
//!
//! Balance math runs in `f64`. Anything that lands in the player's wallet is
//! converted back to whole units through [`to_amount`], which floors and
//! saturates instead of wrapping.

/// Convert a non-negative balance value into a whole resource amount.
///
/// Negative and NaN values become 0; values beyond `u64::MAX` saturate.
#[must_use]
pub fn to_amount(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        // `as` saturates for out-of-range floats.
        value.floor() as u64
    }
}

/// Clamp a probability into `[0, 1]`. NaN is treated as 0.
#[must_use]
pub fn clamp_chance(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

/// Split an accumulator into its whole part and fractional remainder.
///
/// Returns `(whole, remainder)` with `0 <= remainder < 1`.
#[must_use]
pub fn split_whole(progress: f64) -> (u64, f64) {
    if progress.is_nan() || progress <= 0.0 {
        return (0, progress.max(0.0));
    }
    let whole = progress.floor();
    (to_amount(whole), progress - whole)
}

/// Look up a multiplier for a 1-based tier, reusing the last entry past the end.
///
/// An empty table is neutral.
#[must_use]
pub fn tier_lookup(table: &[f64], tier: u32) -> f64 {
    if table.is_empty() {
        return 1.0;
    }
    let index = (tier.max(1) as usize - 1).min(table.len() - 1);
    table[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_amount() {
        assert_eq!(to_amount(10.9), 10);
        assert_eq!(to_amount(-3.0), 0);
        assert_eq!(to_amount(f64::NAN), 0);
        assert_eq!(to_amount(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn test_split_whole_keeps_remainder() {
        let (whole, rest) = split_whole(12.25);
        assert_eq!(whole, 12);
        assert!((rest - 0.25).abs() < 1e-12);

        assert_eq!(split_whole(0.5).0, 0);
    }

    #[test]
    fn test_clamp_chance() {
        assert_eq!(clamp_chance(1.7), 1.0);
        assert_eq!(clamp_chance(-0.2), 0.0);
        assert_eq!(clamp_chance(f64::NAN), 0.0);
    }

    #[test]
    fn test_tier_lookup() {
        let table = [1.0, 1.5, 2.0];
        assert_eq!(tier_lookup(&table, 1), 1.0);
        assert_eq!(tier_lookup(&table, 3), 2.0);
        assert_eq!(tier_lookup(&table, 9), 2.0);
        assert_eq!(tier_lookup(&table, 0), 1.0);
        assert_eq!(tier_lookup(&[], 4), 1.0);
    }
}
