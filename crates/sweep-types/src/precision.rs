//! Decimal precision helpers shared by every strategy.
//!
//! Values are counted and printed through the shortest round-trip text of an
//! `f64`, which is also the text used for cache keys.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Upper bound on scale supported by `rust_decimal`.
const MAX_PLACES: u32 = 28;

/// Number of digits after the decimal point in the textual form of `value`.
///
/// `0.5` has one place, `2` and `0` have none.
pub fn decimal_places(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let text = value.to_string();
    match text.split_once('.') {
        Some((_, fraction)) => (fraction.len() as u32).min(MAX_PLACES),
        None => 0,
    }
}

/// Round `value` to `places` fractional digits, halves away from zero.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let Ok(decimal) = Decimal::try_from(value) else {
        return value;
    };
    decimal
        .round_dp_with_strategy(places.min(MAX_PLACES), RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(value)
}

/// Canonical cache key for a candidate: each value's text joined by `", "`.
pub fn canonical_key(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_fractional_digits() {
        assert_eq!(decimal_places(1.0), 0);
        assert_eq!(decimal_places(0.0), 0);
        assert_eq!(decimal_places(0.5), 1);
        assert_eq!(decimal_places(0.25), 2);
        assert_eq!(decimal_places(-1.125), 3);
        assert_eq!(decimal_places(f64::NAN), 0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(0.1 + 0.2, 1), 0.3);
        assert_eq!(round_to(1.23456, 2), 1.23);
    }

    #[test]
    fn rounding_is_idempotent() {
        for raw in [0.0, 0.15, 1.0 / 3.0, 7.777_77, -4.05] {
            for places in 0..4 {
                let once = round_to(raw, places);
                assert_eq!(round_to(once, places), once);
            }
        }
    }

    #[test]
    fn key_joins_values() {
        assert_eq!(canonical_key(&[1.0, 2.5, 10.0]), "1, 2.5, 10");
        assert_eq!(canonical_key(&[3.0]), "3");
        assert_eq!(canonical_key(&[]), "");
    }
}
