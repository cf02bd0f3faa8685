//! Rounding and clamping shared by the calculation components.
//!
//! All arithmetic stays in [`Decimal`]; rounding happens once per reported
//! amount through [`round_with`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::RoundingMethod;

const TWENTY: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Rounds to two decimal places, midpoint away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use swisstax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a tax amount with a jurisdiction's declared method.
///
/// ```
/// use rust_decimal_macros::dec;
/// use swisstax_core::RoundingMethod;
/// use swisstax_core::calculations::common::round_with;
///
/// assert_eq!(round_with(dec!(10.024), RoundingMethod::Centime), dec!(10.02));
/// assert_eq!(round_with(dec!(10.025), RoundingMethod::FiveCentimes), dec!(10.05));
/// assert_eq!(round_with(dec!(10.50), RoundingMethod::Franc), dec!(11));
/// ```
pub fn round_with(
    value: Decimal,
    method: RoundingMethod,
) -> Decimal {
    match method {
        RoundingMethod::Centime => round_half_up(value),
        RoundingMethod::FiveCentimes => {
            let twentieths =
                (value * TWENTY).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            (twentieths / TWENTY).round_dp(2)
        }
        RoundingMethod::Franc => {
            value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        }
    }
}

/// Truncates a non-negative base down to a multiple of `step`.
/// A missing or non-positive step leaves the value unchanged.
pub fn truncate_to_step(
    value: Decimal,
    step: Option<Decimal>,
) -> Decimal {
    match step {
        Some(step) if step > Decimal::ZERO => (value / step).floor() * step,
        _ => value,
    }
}

/// Clamps negative amounts to zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}
