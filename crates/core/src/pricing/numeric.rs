use std::ops::RangeInclusive;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

/// Precisions `round_to` accepts. Negative values round to tens, hundreds and
/// so on, down to the largest power of ten a `Decimal` holds.
pub const PRECISION_RANGE: RangeInclusive<i32> = -28..=28;

/// Parses operator-entered numbers such as `"1,350.5"`. Anything that is not a
/// number once separators are stripped yields `None`, never zero.
pub fn parse_loose_decimal(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().chars().filter(|ch| *ch != ',').collect::<String>();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

pub fn pow10(exponent: u32) -> Option<Decimal> {
    (0..exponent).try_fold(Decimal::ONE, |factor, _| factor.checked_mul(Decimal::TEN))
}

/// Rounds at `precision` decimal places; a negative precision rounds to tens,
/// hundreds and so on. `None` when the precision is outside `PRECISION_RANGE`
/// or the rounded value does not fit.
pub fn round_to(value: Decimal, precision: i32, strategy: RoundingStrategy) -> Option<Decimal> {
    if !PRECISION_RANGE.contains(&precision) {
        warn!(
            event_name = "pricing.numeric.precision_out_of_range",
            precision,
            "rounding precision out of range; value left unset"
        );
        return None;
    }
    if precision >= 0 {
        return Some(value.round_dp_with_strategy(precision.unsigned_abs(), strategy));
    }

    let factor = pow10(precision.unsigned_abs())?;
    value.checked_div(factor)?.round_dp_with_strategy(0, strategy).checked_mul(factor)
}

/// Floor toward zero at `precision`.
pub fn floor_to(value: Decimal, precision: i32) -> Option<Decimal> {
    round_to(value, precision, RoundingStrategy::ToZero)
}

/// `numerator / denominator`, or zero when the denominator is zero.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

pub fn percent_of(value: Decimal, percent: Decimal) -> Option<Decimal> {
    value.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}
